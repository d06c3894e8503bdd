//! Weather monitoring backend: polls a weather provider for configured
//! cities, stores readings, summarizes them per city and raises threshold
//! alerts. The HTTP surface lives in [`routes`].
//!
//! Modules only reach each other through the re-exports below, so that
//! `routes/*.rs` depend on this crate root rather than on sibling files.

use std::sync::Arc;

pub mod alerts;
pub mod analyzer;
pub mod chart;
pub mod cities;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod schema;
pub mod store;

pub use alerts::AlertEvaluator;
pub use analyzer::{summarize_readings, DailyAnalyzer};
pub use cities::{CityConfig, CityRegistry};
pub use client::WeatherClient;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Alert, Coordinates, DailySummary, WeatherReading};
pub use scheduler::{CycleReport, PollScheduler};
pub use store::{MemoryReadingStore, PgReadingStore, ReadingStore};

// ---

/// Shared handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    // ---
    pub registry: Arc<CityRegistry>,
    pub client: WeatherClient,
    pub store: Arc<dyn ReadingStore>,
    pub analyzer: DailyAnalyzer,
    pub alerts: Arc<AlertEvaluator>,
}

impl AppState {
    // ---
    pub fn new(
        registry: Arc<CityRegistry>,
        client: WeatherClient,
        store: Arc<dyn ReadingStore>,
        alerts: Arc<AlertEvaluator>,
    ) -> Self {
        Self {
            analyzer: DailyAnalyzer::new(store.clone()),
            registry,
            client,
            store,
            alerts,
        }
    }
}
