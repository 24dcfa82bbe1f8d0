//! In-memory result cache, bounded by capacity and tagged with a format version.
//!
//! Eviction follows key order: the front of the order is evicted when the
//! cache is full. A hit moves its key to the back, so reads only influence
//! which entry goes *next*, never the one being evicted right now.
//!
//! `get` drops entries from an older cache version but does not check age;
//! callers decide freshness with [`CacheEntry::is_fresh`].

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: Instant,
    pub version: String,
}

impl<T> CacheEntry<T> {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(Instant::now(), ttl)
    }

    pub fn is_fresh_at(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.timestamp) < ttl
    }
}

/// Snapshot of cache occupancy for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub capacity: usize,
    pub version: String,
    pub keys: Vec<String>,
}

#[derive(Debug)]
pub struct ResultCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
    order: VecDeque<String>,
    capacity: usize,
    version: String,
}

impl<T> ResultCache<T> {
    pub fn new(capacity: usize, version: impl Into<String>) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
            version: version.into(),
        }
    }

    /// Look up `key`, dropping it if it was written under another cache version.
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry<T>> {
        let stale_version = self.entries.get(key)?.version != self.version;
        if stale_version {
            tracing::debug!("Evicting cache entry {} from an older cache version", key);
            self.remove(key);
            return None;
        }

        self.promote(key);
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, data: T) {
        self.set_at(key, data, Instant::now());
    }

    pub fn set_at(&mut self, key: impl Into<String>, data: T, timestamp: Instant) {
        let key = key.into();

        if self.entries.contains_key(&key) {
            self.remove(&key);
        } else if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                tracing::debug!("Cache full, evicting {}", oldest);
                self.entries.remove(&oldest);
            }
        }

        if self.capacity == 0 {
            return;
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                data,
                timestamp,
                version: self.version.clone(),
            },
        );
    }

    /// Switch the live cache version; entries written before become unreadable.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Keys from next-to-evict to most recently used
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.len(),
            capacity: self.capacity,
            version: self.version.clone(),
            keys: self.keys(),
        }
    }

    fn promote(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[test]
    fn test_set_then_get_returns_value() {
        let mut cache = ResultCache::new(50, "1.0");
        cache.set("weather_paris", 19);

        let entry = cache.get("weather_paris").unwrap();
        assert_eq!(entry.data, 19);
        assert!(entry.is_fresh(TTL));
    }

    #[test]
    fn test_missing_key() {
        let mut cache: ResultCache<i32> = ResultCache::new(50, "1.0");
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn test_version_change_hides_old_entries() {
        let mut cache = ResultCache::new(50, "1.0");
        cache.set("lon", vec!["London"]);
        cache.set_version("2.0");

        assert!(cache.get("lon").is_none());
        // Stale entry is gone, not just hidden
        assert!(cache.is_empty());

        cache.set("lon", vec!["London", "Long Beach"]);
        assert_eq!(cache.get("lon").unwrap().version, "2.0");
    }

    #[test]
    fn test_get_does_not_check_age() {
        let mut cache = ResultCache::new(50, "1.0");
        let written = Instant::now();
        cache.set_at("weather_oslo", 3, written);

        let entry = cache.get("weather_oslo").unwrap();
        assert!(!entry.is_fresh_at(written + Duration::from_secs(3600), TTL));
    }

    #[test]
    fn test_freshness_boundary() {
        let now = Instant::now();
        let entry = CacheEntry {
            data: (),
            timestamp: now,
            version: "1.0".into(),
        };
        assert!(entry.is_fresh_at(now + TTL - Duration::from_millis(1), TTL));
        assert!(!entry.is_fresh_at(now + TTL, TTL));
    }

    #[test]
    fn test_overflow_evicts_first_inserted() {
        let mut cache = ResultCache::new(3, "1.0");
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        cache.set("d", 4);

        assert_eq!(cache.len(), 3);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.keys(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_hit_changes_future_eviction_order() {
        let mut cache = ResultCache::new(3, "1.0");
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);

        assert!(cache.get("a").is_some());
        cache.set("d", 4);

        assert!(cache.get("b").is_none());
        assert_eq!(cache.keys(), vec!["c", "a", "d"]);
    }

    #[test]
    fn test_resetting_existing_key_does_not_evict() {
        let mut cache = ResultCache::new(2, "1.0");
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys(), vec!["b", "a"]);
        assert_eq!(cache.get("a").unwrap().data, 10);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = ResultCache::new(0, "1.0");
        cache.set("a", 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats_and_clear() {
        let mut cache = ResultCache::new(50, "1.0");
        cache.set("weather_paris", 1);
        cache.set("forecast_paris", 2);

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.capacity, 50);
        assert_eq!(stats.keys, vec!["weather_paris", "forecast_paris"]);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.keys().is_empty());
    }
}
