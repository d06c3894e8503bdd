//! OpenWeatherMap current-weather client.
//!
//! One call, one outbound request: no retries and no caching. The client is
//! cheap to clone and safe to use from the poll loop and request handlers at
//! the same time.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{Coordinates, RawWeatherPayload, WeatherReading};

// ---

#[derive(Debug, Clone)]
pub struct WeatherClient {
    // ---
    http: Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    // ---
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> AppResult<Self> {
        // ---
        let http = Client::builder()
            .user_agent(concat!("weatherwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Fetch the current weather for `city`.
    ///
    /// With `coordinates` the provider is queried by `lat`/`lon`, which
    /// disambiguates cities sharing a name; otherwise by name. Temperatures are
    /// always requested in metric units.
    pub async fn fetch_current(
        &self,
        city: &str,
        coordinates: Option<Coordinates>,
    ) -> AppResult<WeatherReading> {
        // ---
        if city.trim().is_empty() {
            return Err(AppError::Validation("city name must not be empty".into()));
        }

        let mut params: Vec<(&str, String)> = match coordinates {
            Some(Coordinates { lat, lon }) => vec![("lat", lat.to_string()), ("lon", lon.to_string())],
            None => vec![("q", city.to_string())],
        };
        params.push(("appid", self.api_key.clone()));
        params.push(("units", "metric".to_string()));

        debug!("Fetching current weather for {} (by coordinates: {})", city, coordinates.is_some());

        let request_err = |source| AppError::WeatherRequest {
            city: city.to_string(),
            source,
        };

        let response = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(request_err)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::WeatherFetch {
                city: city.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let payload: RawWeatherPayload = response.json().await.map_err(request_err)?;
        let reading = payload.to_reading(city, Utc::now().timestamp());

        debug!(
            "Fetched {}: {:.1}°C, {} at {}",
            city, reading.temperature, reading.condition, reading.observed_at
        );
        Ok(reading)
    }
}
