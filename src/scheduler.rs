//! Background poll loop: fetch every configured city, store the reading and
//! evaluate alerts, on a fixed period independent of request traffic.
//!
//! The loop is single-flight. Each cycle is awaited before the next tick is
//! taken and missed ticks are skipped, so a slow cycle never overlaps the
//! next one. Cities within a cycle are polled concurrently, and a failure for
//! one city is logged without affecting the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alerts::AlertEvaluator;
use crate::cities::CityRegistry;
use crate::client::WeatherClient;
use crate::error::{AppError, AppResult};
use crate::models::WeatherReading;
use crate::store::ReadingStore;

// ---

/// Totals for one poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub stored: usize,
    pub alerts_raised: usize,
    pub failed: usize,
}

enum CityOutcome {
    FetchFailed,
    StoreFailed,
    Stored { alerted: bool },
}

pub struct PollScheduler {
    // ---
    registry: Arc<CityRegistry>,
    client: WeatherClient,
    store: Arc<dyn ReadingStore>,
    alerts: Arc<AlertEvaluator>,
    period: Duration,
    /// One lock per configured city, held from fetch through alert check so
    /// readings are stored and evaluated in fetch order. Built once from the
    /// registry and never grown.
    city_locks: HashMap<String, Mutex<()>>,
}

impl PollScheduler {
    // ---
    pub fn new(
        registry: Arc<CityRegistry>,
        client: WeatherClient,
        store: Arc<dyn ReadingStore>,
        alerts: Arc<AlertEvaluator>,
        period: Duration,
    ) -> Self {
        // ---
        let city_locks = registry
            .list_cities()
            .iter()
            .map(|city| (city.clone(), Mutex::new(())))
            .collect();

        Self {
            registry,
            client,
            store,
            alerts,
            period,
            city_locks,
        }
    }

    /// Start the recurring loop. The first cycle runs immediately.
    ///
    /// Cancelling `cancel` stops the loop between cycles; a cycle that has
    /// already started always runs to completion.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        // ---
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!("Poll loop started, period {:?}", self.period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.run_cycle().await;
                    }
                }
            }
            info!("Poll loop stopped");
        })
    }

    /// Run one poll cycle over every configured city.
    pub async fn run_cycle(&self) -> CycleReport {
        // ---
        let cities = self.registry.list_cities();
        let started = Instant::now();
        info!("Poll cycle starting for {} cities", cities.len());

        let outcomes = join_all(cities.iter().map(|city| self.poll_city(city))).await;

        let mut report = CycleReport::default();
        for outcome in outcomes {
            match outcome {
                CityOutcome::FetchFailed => report.failed += 1,
                CityOutcome::StoreFailed => {
                    report.fetched += 1;
                    report.failed += 1;
                }
                CityOutcome::Stored { alerted } => {
                    report.fetched += 1;
                    report.stored += 1;
                    report.alerts_raised += usize::from(alerted);
                }
            }
        }

        info!(
            "Poll cycle finished in {:?}: fetched={} stored={} alerts={} failed={}",
            started.elapsed(),
            report.fetched,
            report.stored,
            report.alerts_raised,
            report.failed
        );
        if self.period <= started.elapsed() {
            warn!("Poll cycle took longer than the poll period; the next tick was skipped");
        }
        report
    }

    /// Store a reading and evaluate it against the city's threshold.
    ///
    /// The alert check only runs once the reading has been stored. Returns
    /// whether an alert was raised. Only configured cities are accepted.
    pub async fn ingest(&self, reading: &WeatherReading) -> AppResult<bool> {
        // ---
        let lock = self.city_lock(&reading.city)?;
        let _guard = lock.lock().await;

        self.store_and_check(reading).await
    }

    async fn poll_city(&self, city: &str) -> CityOutcome {
        // ---
        let lock = match self.city_lock(city) {
            Ok(lock) => lock,
            Err(e) => {
                error!("Skipping {}: {}", city, e);
                return CityOutcome::FetchFailed;
            }
        };
        let _guard = lock.lock().await;

        let coordinates = self.registry.coordinates_for(city);
        let reading = match self.client.fetch_current(city, coordinates).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Skipping {} this cycle: {}", city, e);
                return CityOutcome::FetchFailed;
            }
        };

        match self.store_and_check(&reading).await {
            Ok(alerted) => {
                debug!("Stored reading for {} (alert: {})", city, alerted);
                CityOutcome::Stored { alerted }
            }
            Err(e) => {
                error!("Dropping reading for {}: {}", city, e);
                CityOutcome::StoreFailed
            }
        }
    }

    /// Caller must hold the city's lock.
    async fn store_and_check(&self, reading: &WeatherReading) -> AppResult<bool> {
        self.store.save(reading).await?;
        Ok(self.alerts.check_and_record(reading))
    }

    fn city_lock(&self, city: &str) -> AppResult<&Mutex<()>> {
        self.city_locks
            .get(city)
            .ok_or_else(|| AppError::Validation(format!("{city} is not a monitored city")))
    }
}
