use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the weather provider API key
pub const API_KEY_ENV: &str = "WEATHER_API_KEY";

pub const DEFAULT_API_BASE_URL: &str = "https://api.weatherapi.com/v1";
pub const DEFAULT_MONTHLY_CALL_LIMIT: u64 = 1_000_000;
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 30;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CACHE_CAPACITY: usize = 50;
pub const DEFAULT_CACHE_VERSION: &str = "1.0";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MIN_SEARCH_LENGTH: usize = 2;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5000;
pub const DEFAULT_FORECAST_DAYS: u8 = 3;
pub const DEFAULT_SUGGEST_DEBOUNCE_MS: u64 = 300;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather provider and data-access settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Tunables for the weather data-access layer.
///
/// Every field has a default so a partial `[weather]` table is enough.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Base URL of the provider API (no trailing slash)
    pub api_base_url: String,

    /// API key; `WEATHER_API_KEY` in the environment takes precedence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider calls allowed per calendar month
    pub monthly_call_limit: u64,

    /// Outbound requests allowed per 60 second window
    pub rate_limit_per_minute: u32,

    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,

    /// Bumping this invalidates every cached entry
    pub cache_version: String,

    pub request_timeout_secs: u64,

    /// Shortest city-search query sent to the provider
    pub min_search_length: usize,

    /// Retries after the first attempt
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,

    pub forecast_days: u8,

    /// Delay before an autocomplete query is issued
    pub suggest_debounce_ms: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            monthly_call_limit: DEFAULT_MONTHLY_CALL_LIMIT,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_version: DEFAULT_CACHE_VERSION.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            min_search_length: DEFAULT_MIN_SEARCH_LENGTH,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            forecast_days: DEFAULT_FORECAST_DAYS,
            suggest_debounce_ms: DEFAULT_SUGGEST_DEBOUNCE_MS,
        }
    }
}

impl WeatherConfig {
    /// Resolve the API key: environment first, then the config file.
    /// Blank values count as missing.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| self.api_key.clone())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn suggest_debounce(&self) -> Duration {
        Duration::from_millis(self.suggest_debounce_ms)
    }

    fn validate_into(&self, result: &mut ValidationResult) {
        validate_url(&self.api_base_url, "weather.api_base_url", result);

        if self.api_key().is_none() {
            result.add_warning(
                "weather.api_key",
                format!("No API key configured - set {} or weather.api_key", API_KEY_ENV),
            );
        }

        if self.monthly_call_limit == 0 {
            result.add_error("weather.monthly_call_limit", "Monthly limit must be greater than 0");
        }

        if self.rate_limit_per_minute == 0 {
            result.add_error(
                "weather.rate_limit_per_minute",
                "Rate limit must be greater than 0",
            );
        }

        if self.cache_capacity == 0 {
            result.add_error("weather.cache_capacity", "Cache capacity must be greater than 0");
        }

        if self.cache_ttl_secs == 0 {
            result.add_warning("weather.cache_ttl_secs", "Caching disabled (0 seconds)");
        }

        if self.cache_version.trim().is_empty() {
            result.add_error("weather.cache_version", "Cache version must not be empty");
        }

        if self.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.retry_max_delay_ms < self.retry_base_delay_ms {
            result.add_warning(
                "weather.retry_max_delay_ms",
                "Maximum retry delay is below the base delay; every retry waits the maximum",
            );
        }

        if self.forecast_days == 0 {
            result.add_error("weather.forecast_days", "Forecast must cover at least one day");
        } else if self.forecast_days > 14 {
            result.add_warning(
                "weather.forecast_days",
                "Forecast days above 14 are usually rejected by the provider",
            );
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, writing defaults there if the file is absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
            tracing::info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();
        self.weather.validate_into(&mut result);
        result
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// SQLite file holding the persisted usage counter
    pub fn usage_db_path(&self) -> PathBuf {
        self.config_dir.join("usage.db")
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NotFound)?.join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}

/// Validate a URL field
fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }

            if url_str.ends_with('/') {
                result.add_warning(field_name, "Trailing slash will be ignored");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        // Missing API key is only a warning
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let weather = WeatherConfig::default();
        assert_eq!(weather.rate_limit_per_minute, 30);
        assert_eq!(weather.cache_capacity, 50);
        assert_eq!(weather.cache_ttl(), Duration::from_secs(300));
        assert_eq!(weather.request_timeout(), Duration::from_secs(30));
        assert_eq!(weather.min_search_length, 2);
        assert_eq!(weather.max_retries, 2);
        assert_eq!(weather.retry_base_delay_ms, 1000);
        assert_eq!(weather.retry_max_delay_ms, 5000);
        assert_eq!(weather.forecast_days, 3);
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.weather.api_base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.api_base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.weather.api_base_url = "ftp://api.weatherapi.com/v1".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_capacity_and_rate_limit() {
        let mut config = Config::default();
        config.weather.cache_capacity = 0;
        config.weather.rate_limit_per_minute = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.cache_capacity"));
        assert!(result.errors.iter().any(|e| e.field == "weather.rate_limit_per_minute"));
    }

    #[test]
    fn test_zero_ttl_is_warning() {
        let mut config = Config::default();
        config.weather.cache_ttl_secs = 0;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather.cache_ttl_secs"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.config_dir, dir.path());
        assert_eq!(config.weather.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_partial_weather_table_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!(
                "config_dir = {:?}\n\n[weather]\nrate_limit_per_minute = 5\n",
                dir.path().display().to_string()
            ),
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.weather.rate_limit_per_minute, 5);
        assert_eq!(config.weather.cache_version, DEFAULT_CACHE_VERSION);
        assert_eq!(config.usage_db_path(), dir.path().join("usage.db"));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_dir = [unterminated").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_load_validated_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.weather.cache_capacity = 0;
        config.save_to(&path).unwrap();

        let err = Config::load_validated(Some(&path)).unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        assert!(matches!(config_err, ConfigError::Invalid(msg) if msg.contains("cache_capacity")));
    }
}
