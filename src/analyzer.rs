//! Reduces a city's stored readings into a [`DailySummary`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::error::AppResult;
use crate::models::{DailySummary, WeatherReading, UNKNOWN_CONDITION};
use crate::store::ReadingStore;

// ---

#[derive(Clone)]
pub struct DailyAnalyzer {
    store: Arc<dyn ReadingStore>,
}

impl DailyAnalyzer {
    // ---
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    /// Summarize everything currently stored for `city`.
    ///
    /// Only a storage failure is an error; a city without readings yields an
    /// empty summary.
    pub async fn summarize(&self, city: &str) -> AppResult<DailySummary> {
        // ---
        let readings = self.store.all_for(city).await?;
        Ok(summarize_readings(city, &readings))
    }
}

/// Pure reduction behind [`DailyAnalyzer::summarize`].
pub fn summarize_readings(city: &str, readings: &[WeatherReading]) -> DailySummary {
    // ---
    let date = Utc::now().date_naive();

    if readings.is_empty() {
        return DailySummary {
            city: city.to_string(),
            date,
            reading_count: 0,
            avg_temp: None,
            min_temp: None,
            max_temp: None,
            dominant_condition: UNKNOWN_CONDITION.to_string(),
        };
    }

    let temps = readings.iter().map(|r| r.temperature);
    let min_temp = temps.clone().fold(f64::INFINITY, f64::min);
    let max_temp = temps.clone().fold(f64::NEG_INFINITY, f64::max);
    // Clamp so float rounding in the mean can never escape the extrema
    let avg_temp = (temps.sum::<f64>() / readings.len() as f64).clamp(min_temp, max_temp);

    DailySummary {
        city: city.to_string(),
        date,
        reading_count: readings.len(),
        avg_temp: Some(avg_temp),
        min_temp: Some(min_temp),
        max_temp: Some(max_temp),
        dominant_condition: dominant_condition(readings),
    }
}

/// Most frequent condition; ties go to whichever label reached the winning
/// count first in insertion order.
fn dominant_condition(readings: &[WeatherReading]) -> String {
    // ---
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut best: Option<(&str, usize)> = None;

    for reading in readings {
        let count = counts.entry(reading.condition.as_str()).or_insert(0);
        *count += 1;
        if best.map_or(true, |(_, n)| *count > n) {
            best = Some((reading.condition.as_str(), *count));
        }
    }

    best.map(|(label, _)| label.to_string())
        .unwrap_or_else(|| UNKNOWN_CONDITION.to_string())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::store::MemoryReadingStore;
    use proptest::prelude::*;

    fn reading(condition: &str, temperature: f64) -> WeatherReading {
        WeatherReading {
            city: "TestCity".to_string(),
            condition: condition.to_string(),
            temperature,
            feels_like: temperature + 1.0,
            observed_at: 1622555555,
        }
    }

    #[test]
    fn test_empty_summary() {
        // ---
        let summary = summarize_readings("TestCity", &[]);

        assert_eq!(summary.reading_count, 0);
        assert_eq!(summary.avg_temp, None);
        assert_eq!(summary.min_temp, None);
        assert_eq!(summary.max_temp, None);
        assert_eq!(summary.dominant_condition, "Unknown");
    }

    #[test]
    fn test_basic_statistics() {
        // ---
        let summary = summarize_readings("TestCity", &[reading("Clear", 20.0), reading("Cloudy", 25.0)]);

        assert_eq!(summary.avg_temp, Some(22.5));
        assert_eq!(summary.min_temp, Some(20.0));
        assert_eq!(summary.max_temp, Some(25.0));
        assert_eq!(summary.dominant_condition, "Clear");
    }

    #[test]
    fn test_dominant_tie_breaks_by_first_to_reach_max() {
        // ---
        let readings = [
            reading("A", 1.0),
            reading("B", 1.0),
            reading("A", 1.0),
            reading("B", 1.0),
        ];
        assert_eq!(summarize_readings("TestCity", &readings).dominant_condition, "A");

        let readings = [
            reading("B", 1.0),
            reading("A", 1.0),
            reading("A", 1.0),
            reading("B", 1.0),
        ];
        assert_eq!(summarize_readings("TestCity", &readings).dominant_condition, "A");
    }

    #[test]
    fn test_dominant_majority_wins() {
        // ---
        let readings = [
            reading("Rain", 1.0),
            reading("Clear", 1.0),
            reading("Clear", 1.0),
        ];
        assert_eq!(summarize_readings("TestCity", &readings).dominant_condition, "Clear");
    }

    #[tokio::test]
    async fn test_summarize_reads_from_store() {
        // ---
        let store = Arc::new(MemoryReadingStore::new());
        store.save(&reading("Clear", 20.0)).await.unwrap();
        store.save(&reading("Cloudy", 25.0)).await.unwrap();

        let analyzer = DailyAnalyzer::new(store);
        let summary = analyzer.summarize("TestCity").await.unwrap();
        assert_eq!(summary.reading_count, 2);
        assert_eq!(summary.avg_temp, Some(22.5));

        let empty = analyzer.summarize("Elsewhere").await.unwrap();
        assert_eq!(empty.dominant_condition, "Unknown");
    }

    proptest! {
        #[test]
        fn prop_avg_between_extrema(temps in prop::collection::vec(-80.0f64..60.0, 1..64)) {
            // ---
            let readings: Vec<_> = temps.iter().map(|t| reading("Clear", *t)).collect();
            let summary = summarize_readings("TestCity", &readings);

            let (min, avg, max) = (
                summary.min_temp.unwrap(),
                summary.avg_temp.unwrap(),
                summary.max_temp.unwrap(),
            );
            prop_assert!(min <= avg && avg <= max, "{min} <= {avg} <= {max}");
            prop_assert_eq!(summary.reading_count, temps.len());
        }
    }
}
