//! Backoff policy for provider requests.
//!
//! Only timeouts and transport failures are retried (see
//! [`WeatherError::is_retryable`](crate::WeatherError::is_retryable));
//! provider-reported errors and unexpected statuses fail on the first attempt.

use std::time::Duration;

use skycast_core::WeatherConfig;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry (doubles each attempt)
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&WeatherConfig::default())
    }
}

impl From<&WeatherConfig> for RetryConfig {
    fn from(config: &WeatherConfig) -> Self {
        Self::new(
            config.max_retries,
            config.retry_base_delay_ms,
            config.retry_max_delay_ms,
        )
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Total attempts for one logical request
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after the failed attempt with index `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // Exponential backoff: initial_delay * 2^attempt
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.total_attempts(), 3);
        assert_eq!(config.initial_delay, Duration::from_millis(1000));
        assert_eq!(config.max_delay, Duration::from_millis(5000));
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::default();

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig::default();

        // 1000 * 2^3 = 8000 > 5000
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(5000));
        assert_eq!(config.delay_for_attempt(63), Duration::from_millis(5000));
        assert_eq!(config.delay_for_attempt(u32::MAX), Duration::from_millis(5000));
    }

    #[test]
    fn test_delays_increase_until_cap() {
        let config = RetryConfig::new(5, 100, 1000);
        let delays: Vec<_> = (0..4).map(|a| config.delay_for_attempt(a)).collect();
        assert!(delays.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(1000));
    }

    #[test]
    fn test_from_weather_config() {
        let weather = WeatherConfig {
            max_retries: 0,
            retry_base_delay_ms: 10,
            retry_max_delay_ms: 20,
            ..WeatherConfig::default()
        };
        let config = RetryConfig::from(&weather);
        assert_eq!(config.total_attempts(), 1);
        assert_eq!(config.delay_for_attempt(5), Duration::from_millis(20));
    }
}
