//! Monthly provider call counter, persisted across restarts.
//!
//! The counter lives in memory and is written through a [`UsageStore`] after
//! every change. Store failures are logged and otherwise ignored: the in-memory
//! count stays authoritative for the life of the process.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// Key of the persisted usage record
pub const USAGE_STORAGE_KEY: &str = "weather_api_calls";

/// Usage share that triggers a one-time warning
const WARN_THRESHOLD_PERCENT: f64 = 90.0;

/// Persisted form: `{"count": 12, "lastReset": "2026-10-01T00:00:00Z"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub count: u64,
    pub last_reset: DateTime<Utc>,
}

impl UsageRecord {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            last_reset: now,
        }
    }

    fn same_month(&self, now: DateTime<Utc>) -> bool {
        self.last_reset.year() == now.year() && self.last_reset.month() == now.month()
    }
}

/// Where the usage record is kept between runs.
pub trait UsageStore: Send {
    fn load(&self) -> Result<Option<UsageRecord>>;
    fn save(&self, record: &UsageRecord) -> Result<()>;
}

/// SQLite key/value store for the usage record.
pub struct SqliteUsageStore {
    conn: Connection,
}

impl SqliteUsageStore {
    /// Open (or create) the store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl UsageStore for SqliteUsageStore {
    fn load(&self) -> Result<Option<UsageRecord>> {
        let result: Result<String, _> = self.conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![USAGE_STORAGE_KEY],
            |row| row.get(0),
        );
        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, record: &UsageRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?1, ?2)",
            params![USAGE_STORAGE_KEY, json],
        )?;
        Ok(())
    }
}

/// Process-local store; clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemoryUsageStore {
    record: Arc<Mutex<Option<UsageRecord>>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: UsageRecord) -> Self {
        Self {
            record: Arc::new(Mutex::new(Some(record))),
        }
    }

    /// Last record written to the store
    pub fn snapshot(&self) -> Option<UsageRecord> {
        *self.record.lock()
    }
}

impl UsageStore for MemoryUsageStore {
    fn load(&self) -> Result<Option<UsageRecord>> {
        Ok(*self.record.lock())
    }

    fn save(&self, record: &UsageRecord) -> Result<()> {
        *self.record.lock() = Some(*record);
        Ok(())
    }
}

pub struct UsageCounter {
    record: UsageRecord,
    monthly_limit: u64,
    store: Box<dyn UsageStore>,
    warned: bool,
}

impl std::fmt::Debug for UsageCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageCounter")
            .field("record", &self.record)
            .field("monthly_limit", &self.monthly_limit)
            .finish_non_exhaustive()
    }
}

impl UsageCounter {
    /// Restore the counter from `store`, starting fresh if nothing usable is there.
    pub fn load(store: Box<dyn UsageStore>, monthly_limit: u64) -> Self {
        Self::load_at(store, monthly_limit, Utc::now())
    }

    pub fn load_at(store: Box<dyn UsageStore>, monthly_limit: u64, now: DateTime<Utc>) -> Self {
        let record = match store.load() {
            Ok(Some(record)) => record,
            Ok(None) => UsageRecord::fresh(now),
            Err(e) => {
                tracing::warn!("Failed to load API usage, starting from zero: {:#}", e);
                UsageRecord::fresh(now)
            }
        };

        let mut counter = Self {
            record,
            monthly_limit,
            store,
            warned: false,
        };
        counter.roll_over_if_needed(now);
        tracing::debug!(
            "API usage this month: {}/{}",
            counter.record.count,
            counter.monthly_limit
        );
        counter
    }

    /// Count one provider call. Returns the new monthly total.
    pub fn increment(&mut self) -> u64 {
        self.increment_at(Utc::now())
    }

    pub fn increment_at(&mut self, now: DateTime<Utc>) -> u64 {
        self.roll_over_if_needed(now);
        self.record.count = self.record.count.saturating_add(1);
        self.persist();

        let percentage = self.percentage_of_limit();
        if !self.warned && percentage >= WARN_THRESHOLD_PERCENT {
            self.warned = true;
            tracing::warn!(
                "Weather API usage at {:.1}% of the monthly limit ({}/{})",
                percentage,
                self.record.count,
                self.monthly_limit
            );
        }

        self.record.count
    }

    pub fn count(&mut self) -> u64 {
        self.count_at(Utc::now())
    }

    pub fn count_at(&mut self, now: DateTime<Utc>) -> u64 {
        self.roll_over_if_needed(now);
        self.record.count
    }

    /// Share of the monthly limit used, in percent
    pub fn percentage(&mut self) -> f64 {
        self.roll_over_if_needed(Utc::now());
        self.percentage_of_limit()
    }

    pub fn monthly_limit(&self) -> u64 {
        self.monthly_limit
    }

    pub fn last_reset(&self) -> DateTime<Utc> {
        self.record.last_reset
    }

    fn percentage_of_limit(&self) -> f64 {
        if self.monthly_limit == 0 {
            return 100.0;
        }
        100.0 * self.record.count as f64 / self.monthly_limit as f64
    }

    fn roll_over_if_needed(&mut self, now: DateTime<Utc>) {
        if self.record.same_month(now) {
            return;
        }
        tracing::info!(
            "New month, resetting API usage (was {} calls)",
            self.record.count
        );
        self.record = UsageRecord::fresh(now);
        self.warned = false;
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.record) {
            tracing::warn!("Failed to persist API usage: {:#}", e);
        }
    }
}
