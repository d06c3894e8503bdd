//! Data models for the weather pipeline.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Sentinel condition used when nothing better is known.
pub const UNKNOWN_CONDITION: &str = "Unknown";

/// Latitude/longitude pair for coordinate-based provider lookups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    // ---
    pub lat: f64,
    pub lon: f64,
}

/// Raw current-weather payload from the provider.
///
/// Only the fields the pipeline needs are modelled; everything else in the
/// response is ignored.
#[derive(Debug, Deserialize)]
pub struct RawWeatherPayload {
    // ---
    #[serde(default)]
    pub weather: Vec<RawCondition>,
    pub main: RawMain,
    /// Kept untyped so a missing or malformed timestamp never fails the decode.
    #[serde(default)]
    pub dt: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawCondition {
    pub main: String,
}

#[derive(Debug, Deserialize)]
pub struct RawMain {
    pub temp: f64,
    pub feels_like: f64,
}

/// One immutable weather observation for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeatherReading {
    // ---
    pub city: String,
    pub condition: String,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Degrees Celsius.
    pub feels_like: f64,
    /// Unix timestamp, seconds.
    pub observed_at: i64,
}

/// A reading that breached its city's threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    // ---
    #[serde(flatten)]
    pub reading: WeatherReading,
    /// Threshold in force when the breach was detected.
    pub threshold: f64,
}

/// Per-city reduction of stored readings, computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    // ---
    pub city: String,
    pub date: NaiveDate,
    pub reading_count: usize,
    pub avg_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub dominant_condition: String,
}

impl RawWeatherPayload {
    // ---
    /// Map the provider payload into a reading for `city`.
    ///
    /// `fetched_at` stands in for the observation time whenever `dt` is absent,
    /// non-numeric or negative.
    pub fn to_reading(&self, city: &str, fetched_at: i64) -> WeatherReading {
        // ---
        let observed_at = self
            .dt
            .as_ref()
            .and_then(|v| {
                v.as_i64()
                    .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            })
            .filter(|ts| *ts >= 0)
            .unwrap_or(fetched_at);

        let condition = self
            .weather
            .first()
            .map(|c| c.main.clone())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNKNOWN_CONDITION.to_string());

        WeatherReading {
            city: city.to_string(),
            condition,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            observed_at,
        }
    }
}

impl WeatherReading {
    // ---
    /// Build a reading stamped with the current time.
    pub fn now(city: &str, condition: &str, temperature: f64, feels_like: f64) -> Self {
        Self {
            city: city.to_string(),
            condition: condition.to_string(),
            temperature,
            feels_like,
            observed_at: Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    fn payload(dt: serde_json::Value) -> RawWeatherPayload {
        // ---
        serde_json::from_value(json!({
            "weather": [{ "main": "Clear", "description": "clear sky" }],
            "main": { "temp": 20.0, "feels_like": 22.0, "humidity": 40 },
            "dt": dt,
            "name": "TestCity"
        }))
        .unwrap()
    }

    #[test]
    fn test_payload_mapping() {
        // ---
        let reading = payload(json!(1622555555)).to_reading("TestCity", 99);

        assert_eq!(reading.city, "TestCity");
        assert_eq!(reading.condition, "Clear");
        assert_eq!(reading.temperature, 20.0);
        assert_eq!(reading.feels_like, 22.0);
        assert_eq!(reading.observed_at, 1622555555);
    }

    #[test]
    fn test_missing_timestamp_uses_fetch_time() {
        // ---
        let raw: RawWeatherPayload = serde_json::from_value(json!({
            "weather": [{ "main": "Rain" }],
            "main": { "temp": 12.5, "feels_like": 11.0 }
        }))
        .unwrap();

        assert_eq!(raw.to_reading("Oslo", 1_700_000_000).observed_at, 1_700_000_000);
    }

    #[test]
    fn test_malformed_timestamp_uses_fetch_time() {
        // ---
        assert_eq!(payload(json!("yesterday")).to_reading("X", 42).observed_at, 42);
        assert_eq!(payload(json!(-5)).to_reading("X", 42).observed_at, 42);
        assert_eq!(payload(json!(null)).to_reading("X", 42).observed_at, 42);
        assert_eq!(payload(json!(1622555555.9)).to_reading("X", 42).observed_at, 1622555555);
    }

    #[test]
    fn test_missing_condition_is_unknown() {
        // ---
        let raw: RawWeatherPayload = serde_json::from_value(json!({
            "weather": [],
            "main": { "temp": 1.0, "feels_like": -2.0 },
            "dt": 10
        }))
        .unwrap();

        assert_eq!(raw.to_reading("Nuuk", 0).condition, UNKNOWN_CONDITION);
    }

    #[test]
    fn test_missing_temperature_fails_decode() {
        // ---
        let result = serde_json::from_value::<RawWeatherPayload>(json!({
            "weather": [{ "main": "Clear" }],
            "dt": 10
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_alert_serializes_flat() {
        // ---
        let alert = Alert {
            reading: WeatherReading {
                city: "TestCity".into(),
                condition: "Clear".into(),
                temperature: 32.0,
                feels_like: 35.0,
                observed_at: 1622555555,
            },
            threshold: 30.0,
        };

        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["city"], "TestCity");
        assert_eq!(value["temperature"], 32.0);
        assert_eq!(value["threshold"], 30.0);
        assert!(value.get("reading").is_none());
    }
}
