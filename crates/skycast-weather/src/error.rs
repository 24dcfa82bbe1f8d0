//! Weather data-access error types.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("City name must not be empty")]
    EmptyCity,

    #[error("Weather API key is missing")]
    MissingApiKey,

    #[error("Rate limit exceeded, too many requests this minute")]
    RateLimited,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Transport failure, stored without its request URL.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Network error: provider unreachable after {attempts} attempts")]
    Unreachable { attempts: u32 },

    #[error("Provider error ({status}): {message}")]
    Provider {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("HTTP error! status: {0}")]
    Http(u16),

    #[error("Invalid forecast data received")]
    InvalidForecastData,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Request superseded by a newer search")]
    Cancelled,
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.without_url())
    }
}

impl WeatherError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCity => "Please enter a city name.".to_string(),
            Self::MissingApiKey => {
                "Weather service is not configured. Set WEATHER_API_KEY.".to_string()
            }
            Self::RateLimited => "Too many requests. Please wait a minute.".to_string(),
            Self::Timeout(_) | Self::Network(_) | Self::Unreachable { .. } => {
                "Network error. Check your connection.".to_string()
            }
            // The provider's own message is already meant for people
            Self::Provider { message, .. } => message.clone(),
            Self::Http(status) => format!("Weather service returned an error ({}).", status),
            Self::InvalidForecastData => "Forecast data is unavailable for this city.".to_string(),
            Self::Parse(_) => "Received an unexpected response. Please try again.".to_string(),
            Self::Cancelled => "Search cancelled.".to_string(),
        }
    }

    /// Whether another attempt of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        assert!(WeatherError::EmptyCity.user_message().contains("city"));
        assert!(WeatherError::MissingApiKey.user_message().contains("WEATHER_API_KEY"));

        let err = WeatherError::Provider {
            status: 400,
            code: Some(1006),
            message: "No matching location found.".into(),
        };
        assert_eq!(err.user_message(), "No matching location found.");
    }

    #[test]
    fn test_is_retryable() {
        assert!(WeatherError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!WeatherError::RateLimited.is_retryable());
        assert!(!WeatherError::Http(500).is_retryable());
        assert!(!WeatherError::Unreachable { attempts: 3 }.is_retryable());
        assert!(!WeatherError::Provider {
            status: 403,
            code: None,
            message: "API key disabled".into(),
        }
        .is_retryable());
    }

    #[test]
    fn test_network_display_mentions_network() {
        let err = WeatherError::Unreachable { attempts: 3 };
        assert!(err.to_string().to_lowercase().contains("network"));
        assert!(err.to_string().contains('3'));
    }
}
