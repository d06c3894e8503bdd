//! Per-city temperature thresholds and alert history.
//!
//! A city without a threshold never alerts. Once a threshold is set it stays
//! active; later calls overwrite the value in place. Each city's history is a
//! bounded ring, oldest alerts dropped first.

use std::collections::{HashMap, VecDeque};

use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::models::{Alert, WeatherReading};

// ---

pub struct AlertEvaluator {
    // ---
    thresholds: RwLock<HashMap<String, f64>>,
    alerts: Mutex<HashMap<String, VecDeque<Alert>>>,
    history_max: usize,
}

impl AlertEvaluator {
    // ---
    pub fn new(history_max: usize) -> Self {
        Self {
            thresholds: RwLock::new(HashMap::new()),
            alerts: Mutex::new(HashMap::new()),
            history_max: history_max.max(1),
        }
    }

    /// Set or overwrite the alert threshold for `city`.
    pub fn set_threshold(&self, city: &str, value: f64) {
        self.thresholds.write().insert(city.to_string(), value);
    }

    pub fn threshold_for(&self, city: &str) -> Option<f64> {
        self.thresholds.read().get(city).copied()
    }

    /// Evaluate a freshly ingested reading, recording an alert when its
    /// temperature is strictly above the city's threshold.
    ///
    /// Returns whether an alert was raised.
    pub fn check_and_record(&self, reading: &WeatherReading) -> bool {
        // ---
        let Some(threshold) = self.threshold_for(&reading.city) else {
            return false;
        };
        if reading.temperature <= threshold {
            return false;
        }

        warn!(
            "Alert for {}: {:.2}°C exceeds threshold {:.2}°C",
            reading.city, reading.temperature, threshold
        );

        let mut alerts = self.alerts.lock();
        let history = alerts.entry(reading.city.clone()).or_default();
        if history.len() == self.history_max {
            history.pop_front();
        }
        history.push_back(Alert {
            reading: reading.clone(),
            threshold,
        });
        true
    }

    /// Alerts for `city` in detection order.
    pub fn alerts_for(&self, city: &str) -> Vec<Alert> {
        self.alerts
            .lock()
            .get(city)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }
}
