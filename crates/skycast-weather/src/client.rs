//! Provider HTTP client: rate limiting, usage counting, timeouts and retries.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use skycast_core::WeatherConfig;
use tracing::instrument;

use crate::error::WeatherError;
use crate::provider::ProviderErrorBody;
use crate::rate_limit::RateLimiter;
use crate::retry::RetryConfig;
use crate::usage::UsageCounter;

const USER_AGENT: &str = concat!("skycast/", env!("CARGO_PKG_VERSION"));

/// Provider endpoints used by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Search,
    Current,
    Forecast { days: u8 },
}

impl Endpoint {
    fn path(&self) -> &'static str {
        match self {
            Self::Search => "search.json",
            Self::Current => "current.json",
            Self::Forecast { .. } => "forecast.json",
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryConfig,
    timeout: Duration,
    limiter: Mutex<RateLimiter>,
    usage: Arc<Mutex<UsageCounter>>,
}

impl ApiClient {
    /// Build a client around an explicitly constructed limiter and usage counter.
    pub fn new(
        config: &WeatherConfig,
        api_key: Option<String>,
        limiter: RateLimiter,
        usage: Arc<Mutex<UsageCounter>>,
    ) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
            retry: RetryConfig::from(config),
            timeout: config.request_timeout(),
            limiter: Mutex::new(limiter),
            usage,
        })
    }

    /// Override the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Full request URL for `endpoint`. `query` must already be percent-encoded.
    ///
    /// Fails with [`WeatherError::MissingApiKey`] before anything touches the network.
    pub fn url_for(&self, endpoint: Endpoint, query: &str) -> Result<String, WeatherError> {
        let key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(WeatherError::MissingApiKey)?;

        let mut url = format!(
            "{}/{}?key={}&q={}",
            self.base_url,
            endpoint.path(),
            urlencoding::encode(key),
            query
        );
        if let Endpoint::Forecast { days } = endpoint {
            url.push_str(&format!("&days={}&aqi=no", days));
        }
        Ok(url)
    }

    pub fn usage(&self) -> &Arc<Mutex<UsageCounter>> {
        &self.usage
    }

    /// Fetch and decode one provider resource.
    ///
    /// `label` names the operation in logs and parse errors.
    #[instrument(skip(self, url), level = "debug")]
    pub async fn fetch_api<T: DeserializeOwned>(
        &self,
        url: &str,
        label: &str,
    ) -> Result<T, WeatherError> {
        if !self.limiter.lock().can_make_request() {
            return Err(WeatherError::RateLimited);
        }

        let attempts = self.retry.total_attempts();
        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for_attempt(attempt - 1);
                tracing::info!(
                    "{}: retry attempt {} of {}, waiting {:?}",
                    label,
                    attempt,
                    self.retry.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            // Retries belong to the same logical call
            if attempt == 0 {
                self.usage.lock().increment();
            }

            match self.attempt(url, label).await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!("{}: succeeded after {} retries", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        "{}: retryable error on attempt {} of {}: {}",
                        label,
                        attempt + 1,
                        attempts,
                        e
                    );
                }
                Err(e) => {
                    tracing::debug!("{}: non-retryable error: {}", label, e);
                    return Err(e);
                }
            }
        }

        tracing::error!("{}: all {} attempts exhausted", label, attempts);
        Err(WeatherError::Unreachable { attempts })
    }

    /// One bounded request: send, read the body, classify.
    async fn attempt<T: DeserializeOwned>(
        &self,
        url: &str,
        label: &str,
    ) -> Result<T, WeatherError> {
        let exchange = async {
            let response = self.http.get(url).send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) if e.is_timeout() => return Err(WeatherError::Timeout(self.timeout)),
            Ok(Err(e)) => return Err(WeatherError::from(e)),
            Err(_) => return Err(WeatherError::Timeout(self.timeout)),
        };

        if !status.is_success() {
            return Err(match ProviderErrorBody::parse(&body) {
                Some((code, message)) => WeatherError::Provider {
                    status: status.as_u16(),
                    code,
                    message,
                },
                None => WeatherError::Http(status.as_u16()),
            });
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::Parse(format!("{}: {}", label, e)))
    }
}
