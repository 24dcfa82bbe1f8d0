//! City search, current conditions and forecasts, served from the result
//! cache when possible.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use skycast_core::WeatherConfig;
use tracing::instrument;

use crate::cache::{CacheStats, ResultCache};
use crate::client::{ApiClient, Endpoint};
use crate::error::WeatherError;
use crate::provider::{CurrentResponse, ForecastResponse};
use crate::rate_limit::RateLimiter;
use crate::types::{CitySearchResult, ForecastBundle, UsageSnapshot, WeatherBundle, WeatherSnapshot};
use crate::usage::{UsageCounter, UsageStore};

/// Anything the service keeps in its result cache
#[derive(Debug, Clone)]
pub enum CachedPayload {
    Cities(Vec<CitySearchResult>),
    Weather(WeatherSnapshot),
    Forecast(ForecastBundle),
}

/// Trim, lower-case and percent-encode user input.
///
/// The result doubles as the provider `q` parameter and the cache key body.
pub fn sanitize_query(query: &str) -> String {
    urlencoding::encode(&query.trim().to_lowercase()).into_owned()
}

pub struct WeatherService {
    client: ApiClient,
    cache: Mutex<ResultCache<CachedPayload>>,
    cache_ttl: Duration,
    min_search_length: usize,
    forecast_days: u8,
}

impl WeatherService {
    pub fn new(
        config: &WeatherConfig,
        client: ApiClient,
        cache: ResultCache<CachedPayload>,
    ) -> Self {
        Self {
            client,
            cache: Mutex::new(cache),
            cache_ttl: config.cache_ttl(),
            min_search_length: config.min_search_length,
            forecast_days: config.forecast_days,
        }
    }

    /// Wire up limiter, usage counter, client and cache from configuration.
    pub fn from_config(
        config: &WeatherConfig,
        usage_store: Box<dyn UsageStore>,
    ) -> Result<Self, WeatherError> {
        let usage = UsageCounter::load(usage_store, config.monthly_call_limit);
        let client = ApiClient::new(
            config,
            config.api_key(),
            RateLimiter::new(config.rate_limit_per_minute),
            Arc::new(Mutex::new(usage)),
        )?;
        let cache = ResultCache::new(config.cache_capacity, config.cache_version.clone());
        Ok(Self::new(config, client, cache))
    }

    /// Autocomplete suggestions. Never fails: short queries and errors yield an empty list.
    #[instrument(skip(self), level = "info")]
    pub async fn search_cities(&self, query: &str) -> Vec<CitySearchResult> {
        let trimmed = query.trim();
        if trimmed.chars().count() < self.min_search_length {
            return Vec::new();
        }

        let key = sanitize_query(trimmed);
        if let Some(CachedPayload::Cities(cities)) = self.cached(&key) {
            tracing::debug!("City search cache hit for {}", key);
            return cities;
        }

        let result = match self.client.url_for(Endpoint::Search, &key) {
            Ok(url) => {
                self.client
                    .fetch_api::<Vec<CitySearchResult>>(&url, "Failed to search cities")
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(cities) => {
                self.store(key, CachedPayload::Cities(cities.clone()));
                cities
            }
            Err(e) => {
                tracing::warn!("City search for {:?} failed: {}", trimmed, e);
                Vec::new()
            }
        }
    }

    /// Current conditions for `city`.
    #[instrument(skip(self), level = "info")]
    pub async fn get_weather_data(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        let query = Self::require_city(city)?;
        let key = format!("weather_{}", query);
        if let Some(CachedPayload::Weather(snapshot)) = self.cached(&key) {
            tracing::debug!("Weather cache hit for {}", key);
            return Ok(snapshot);
        }

        let url = self.client.url_for(Endpoint::Current, &query)?;
        let response: CurrentResponse = self
            .client
            .fetch_api(&url, "Failed to fetch weather data")
            .await?;

        let snapshot = response.into_snapshot();
        self.store(key, CachedPayload::Weather(snapshot.clone()));
        Ok(snapshot)
    }

    /// Daily and hourly forecast for `city`.
    #[instrument(skip(self), level = "info")]
    pub async fn get_forecast_data(&self, city: &str) -> Result<ForecastBundle, WeatherError> {
        let query = Self::require_city(city)?;
        let key = format!("forecast_{}", query);
        if let Some(CachedPayload::Forecast(bundle)) = self.cached(&key) {
            tracing::debug!("Forecast cache hit for {}", key);
            return Ok(bundle);
        }

        let url = self.client.url_for(
            Endpoint::Forecast {
                days: self.forecast_days,
            },
            &query,
        )?;
        let response: ForecastResponse = self
            .client
            .fetch_api(&url, "Failed to fetch forecast data")
            .await?;

        let bundle = response.into_bundle()?;
        self.store(key, CachedPayload::Forecast(bundle.clone()));
        Ok(bundle)
    }

    /// Current conditions and forecast, fetched concurrently.
    ///
    /// Both requests run to completion; the bundle fails if either does.
    pub async fn get_weather_bundle(&self, city: &str) -> Result<WeatherBundle, WeatherError> {
        let (current, forecast) =
            tokio::join!(self.get_weather_data(city), self.get_forecast_data(city));
        Ok(WeatherBundle {
            current: current?,
            forecast: forecast?,
        })
    }

    pub fn usage(&self) -> UsageSnapshot {
        let mut usage = self.client.usage().lock();
        let count = usage.count();
        UsageSnapshot {
            count,
            limit: usage.monthly_limit(),
            percentage: usage.percentage(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    fn require_city(city: &str) -> Result<String, WeatherError> {
        if city.trim().is_empty() {
            return Err(WeatherError::EmptyCity);
        }
        Ok(sanitize_query(city))
    }

    /// Fresh cached payload for `key`, if any.
    fn cached(&self, key: &str) -> Option<CachedPayload> {
        let mut cache = self.cache.lock();
        let entry = cache.get(key)?;
        if entry.is_fresh(self.cache_ttl) {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    fn store(&self, key: String, payload: CachedPayload) {
        self.cache.lock().set(key, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_query() {
        assert_eq!(sanitize_query("  Lon "), "lon");
        assert_eq!(sanitize_query("New York"), "new%20york");
        assert_eq!(sanitize_query("São Paulo"), "s%C3%A3o%20paulo");
        assert_eq!(sanitize_query("a&b=c"), "a%26b%3Dc");
    }

    #[test]
    fn test_require_city() {
        assert!(matches!(
            WeatherService::require_city("   "),
            Err(WeatherError::EmptyCity)
        ));
        assert!(matches!(WeatherService::require_city(" Paris"), Ok(q) if q == "paris"));
    }
}
