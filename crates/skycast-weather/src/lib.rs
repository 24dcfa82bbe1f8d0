//! Weather data access for Skycast
//!
//! City search, current conditions and forecasts from WeatherAPI.com, with
//! a versioned result cache, a per-minute rate limiter and a persisted
//! monthly usage counter.

pub mod cache;
pub mod client;
pub mod error;
pub mod provider;
pub mod rate_limit;
pub mod retry;
pub mod service;
pub mod session;
pub mod types;
pub mod usage;

pub use cache::{CacheEntry, CacheStats, ResultCache};
pub use client::{ApiClient, Endpoint};
pub use error::WeatherError;
pub use rate_limit::RateLimiter;
pub use retry::RetryConfig;
pub use service::{sanitize_query, CachedPayload, WeatherService};
pub use session::SearchSession;
pub use types::*;
pub use usage::{MemoryUsageStore, SqliteUsageStore, UsageCounter, UsageRecord, UsageStore};
