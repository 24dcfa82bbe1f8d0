//! One interactive search at a time.
//!
//! Starting a search cancels the one before it, and a newer suggestion
//! request cancels a pending (debounced) one. Cancelled calls resolve
//! immediately; they never wait for the network.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::WeatherError;
use crate::service::WeatherService;
use crate::types::{CitySearchResult, WeatherBundle};

pub struct SearchSession {
    service: Arc<WeatherService>,
    debounce: Duration,
    search: Mutex<Option<CancellationToken>>,
    suggestion: Mutex<Option<CancellationToken>>,
}

impl SearchSession {
    pub fn new(service: Arc<WeatherService>, debounce: Duration) -> Self {
        Self {
            service,
            debounce,
            search: Mutex::new(None),
            suggestion: Mutex::new(None),
        }
    }

    pub fn service(&self) -> &Arc<WeatherService> {
        &self.service
    }

    /// Fetch current conditions and forecast, superseding any search in flight.
    pub async fn search(&self, city: &str) -> Result<WeatherBundle, WeatherError> {
        let token = Self::start(&self.search);
        // Pending autocomplete belongs to the old search
        Self::cancel_slot(&self.suggestion);

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("Search for {:?} superseded", city);
                Err(WeatherError::Cancelled)
            }
            result = self.service.get_weather_bundle(city) => result,
        }
    }

    /// Debounced autocomplete; superseded calls return an empty list.
    pub async fn suggest(&self, query: &str) -> Vec<CitySearchResult> {
        let token = Self::start(&self.suggestion);

        tokio::select! {
            biased;
            _ = token.cancelled() => return Vec::new(),
            _ = tokio::time::sleep(self.debounce) => {}
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => Vec::new(),
            cities = self.service.search_cities(query) => cities,
        }
    }

    /// Cancel whatever is in flight.
    pub fn cancel(&self) {
        Self::cancel_slot(&self.search);
        Self::cancel_slot(&self.suggestion);
    }

    fn start(slot: &Mutex<Option<CancellationToken>>) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = slot.lock().replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    fn cancel_slot(slot: &Mutex<Option<CancellationToken>>) {
        if let Some(token) = slot.lock().take() {
            token.cancel();
        }
    }
}
