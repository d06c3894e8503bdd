//! Poll cycle behaviour: fetch, store, alert, with per-city failure isolation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use weatherwatch::{
    AlertEvaluator, AppError, AppResult, CityRegistry, CycleReport, MemoryReadingStore,
    PollScheduler, ReadingStore, WeatherClient, WeatherReading,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEATHER_PATH: &str = "/data/2.5/weather";

fn payload(condition: &str, temp: f64) -> serde_json::Value {
    serde_json::json!({
        "weather": [{ "main": condition }],
        "main": { "temp": temp, "feels_like": temp + 2.0 },
        "dt": 1622555555
    })
}

async fn mock_city(server: &MockServer, city: &str, response: ResponseTemplate) {
    // ---
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .and(query_param("q", city))
        .respond_with(response)
        .mount(server)
        .await;
}

fn scheduler(
    server: &MockServer,
    registry: CityRegistry,
    store: Arc<dyn ReadingStore>,
    alerts: Arc<AlertEvaluator>,
    period: Duration,
) -> PollScheduler {
    // ---
    let url = format!("{}{}", server.uri(), WEATHER_PATH);
    let client = WeatherClient::new(&url, "test_key", Duration::from_secs(5)).unwrap();
    PollScheduler::new(Arc::new(registry), client, store, alerts, period)
}

/// Store that rejects every write.
struct FailingStore;

#[async_trait]
impl ReadingStore for FailingStore {
    async fn save(&self, _reading: &WeatherReading) -> AppResult<()> {
        Err(AppError::Storage(sqlx::Error::PoolTimedOut))
    }

    async fn all_for(&self, _city: &str) -> AppResult<Vec<WeatherReading>> {
        Ok(Vec::new())
    }
}

/// Store whose writes take longer the lower the temperature, so unserialized
/// concurrent saves would land in reverse order.
#[derive(Default)]
struct SlowStore {
    inner: MemoryReadingStore,
}

#[async_trait]
impl ReadingStore for SlowStore {
    async fn save(&self, reading: &WeatherReading) -> AppResult<()> {
        let delay = (50.0 - reading.temperature).max(0.0) as u64 * 5;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.inner.save(reading).await
    }

    async fn all_for(&self, city: &str) -> AppResult<Vec<WeatherReading>> {
        self.inner.all_for(city).await
    }
}

fn temperatures(readings: &[WeatherReading]) -> Vec<f64> {
    readings.iter().map(|r| r.temperature).collect()
}

#[tokio::test]
async fn one_city_failing_does_not_abort_the_cycle() {
    // ---
    let server = MockServer::start().await;
    mock_city(&server, "Delhi", ResponseTemplate::new(200).set_body_json(payload("Haze", 32.0))).await;
    mock_city(&server, "Mumbai", ResponseTemplate::new(500).set_body_string("upstream exploded")).await;
    mock_city(&server, "Chennai", ResponseTemplate::new(200).set_body_json(payload("Rain", 28.0))).await;

    let store = Arc::new(MemoryReadingStore::new());
    let alerts = Arc::new(AlertEvaluator::new(100));
    alerts.set_threshold("Delhi", 30.0);
    alerts.set_threshold("Chennai", 30.0);

    let registry = CityRegistry::from_names(&["Delhi", "Mumbai", "Chennai"]).unwrap();
    let poller = scheduler(&server, registry, store.clone(), alerts.clone(), Duration::from_secs(300));

    let report = poller.run_cycle().await;

    assert_eq!(
        report,
        CycleReport {
            fetched: 2,
            stored: 2,
            alerts_raised: 1,
            failed: 1,
        }
    );
    assert_eq!(store.all_for("Delhi").await.unwrap().len(), 1);
    assert!(store.all_for("Mumbai").await.unwrap().is_empty());
    assert_eq!(store.all_for("Chennai").await.unwrap().len(), 1);

    let delhi_alerts = alerts.alerts_for("Delhi");
    assert_eq!(delhi_alerts.len(), 1);
    assert_eq!(delhi_alerts[0].reading.temperature, 32.0);
    assert!(alerts.alerts_for("Chennai").is_empty());
}

#[tokio::test]
async fn failed_save_skips_alert_check() {
    // ---
    let server = MockServer::start().await;
    mock_city(&server, "Delhi", ResponseTemplate::new(200).set_body_json(payload("Haze", 45.0))).await;

    let alerts = Arc::new(AlertEvaluator::new(100));
    alerts.set_threshold("Delhi", 30.0);

    let registry = CityRegistry::from_names(&["Delhi"]).unwrap();
    let poller = scheduler(&server, registry, Arc::new(FailingStore), alerts.clone(), Duration::from_secs(300));

    let report = poller.run_cycle().await;

    assert_eq!(report.fetched, 1);
    assert_eq!(report.stored, 0);
    assert_eq!(report.failed, 1);
    assert!(alerts.alerts_for("Delhi").is_empty());
}

#[tokio::test]
async fn ingest_stores_then_alerts() {
    // ---
    let server = MockServer::start().await;
    let store = Arc::new(MemoryReadingStore::new());
    let alerts = Arc::new(AlertEvaluator::new(100));
    let registry = CityRegistry::from_names(&["TestCity"]).unwrap();
    let poller = scheduler(&server, registry, store.clone(), alerts.clone(), Duration::from_secs(300));

    alerts.set_threshold("TestCity", 30.0);
    let reading = WeatherReading::now("TestCity", "Clear", 32.0, 34.0);

    assert!(poller.ingest(&reading).await.unwrap());
    assert_eq!(alerts.alerts_for("TestCity").len(), 1);
    assert_eq!(alerts.alerts_for("TestCity")[0].reading, reading);
    assert_eq!(store.all_for("TestCity").await.unwrap(), vec![reading]);
}

#[tokio::test]
async fn map_form_registry_polls_by_coordinates() {
    // ---
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .and(query_param("lat", "30.27"))
        .and(query_param("lon", "-97.74"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload("Clear", 35.0)))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryReadingStore::new());
    let registry = CityRegistry::from_json_str(r#"{"Austin": {"lat": 30.27, "lon": -97.74}}"#).unwrap();
    let poller = scheduler(
        &server,
        registry,
        store.clone(),
        Arc::new(AlertEvaluator::new(100)),
        Duration::from_secs(300),
    );

    let report = poller.run_cycle().await;
    assert_eq!(report.stored, 1);
    assert_eq!(store.all_for("Austin").await.unwrap()[0].city, "Austin");
}

#[tokio::test]
async fn spawned_loop_runs_first_cycle_and_stops_on_cancel() {
    // ---
    let server = MockServer::start().await;
    mock_city(&server, "Delhi", ResponseTemplate::new(200).set_body_json(payload("Clear", 25.0))).await;

    let store = Arc::new(MemoryReadingStore::new());
    let registry = CityRegistry::from_names(&["Delhi"]).unwrap();
    let poller = Arc::new(scheduler(
        &server,
        registry,
        store.clone(),
        Arc::new(AlertEvaluator::new(100)),
        Duration::from_secs(3600),
    ));

    let cancel = CancellationToken::new();
    let handle = poller.spawn(cancel.clone());

    let stored = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if !store.all_for("Delhi").await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(stored.is_ok(), "first poll cycle never stored a reading");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("poll loop did not stop")
        .unwrap();

    // Period is an hour, so exactly one cycle ran
    assert_eq!(store.all_for("Delhi").await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_ingests_keep_store_and_alert_order() {
    // ---
    let server = MockServer::start().await;
    let store = Arc::new(SlowStore::default());
    let alerts = Arc::new(AlertEvaluator::new(100));
    alerts.set_threshold("TestCity", 30.0);

    let registry = CityRegistry::from_names(&["TestCity"]).unwrap();
    let poller = scheduler(&server, registry, store.clone(), alerts.clone(), Duration::from_secs(300));

    let readings: Vec<WeatherReading> = [31.0, 33.0, 35.0, 37.0, 39.0]
        .into_iter()
        .map(|t| WeatherReading::now("TestCity", "Clear", t, t))
        .collect();

    let results = join_all(readings.iter().map(|r| poller.ingest(r))).await;
    assert!(results.into_iter().all(|r| r.unwrap()));

    let expected = vec![31.0, 33.0, 35.0, 37.0, 39.0];
    assert_eq!(temperatures(&store.all_for("TestCity").await.unwrap()), expected);

    let alerted: Vec<f64> = alerts
        .alerts_for("TestCity")
        .iter()
        .map(|a| a.reading.temperature)
        .collect();
    assert_eq!(alerted, expected);
}

#[tokio::test]
async fn overlapping_cycles_store_readings_in_fetch_order() {
    // ---
    let server = MockServer::start().await;

    // The first fetch is slow; a second cycle must not overtake it
    Mock::given(method("GET"))
        .and(path(WEATHER_PATH))
        .and(query_param("q", "Delhi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(payload("Clear", 10.0))
                .set_delay(Duration::from_millis(200)),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mock_city(&server, "Delhi", ResponseTemplate::new(200).set_body_json(payload("Clear", 20.0))).await;

    let store = Arc::new(MemoryReadingStore::new());
    let registry = CityRegistry::from_names(&["Delhi"]).unwrap();
    let poller = scheduler(
        &server,
        registry,
        store.clone(),
        Arc::new(AlertEvaluator::new(100)),
        Duration::from_secs(300),
    );

    let (first, second) = tokio::join!(poller.run_cycle(), poller.run_cycle());
    assert_eq!(first.stored, 1);
    assert_eq!(second.stored, 1);

    assert_eq!(temperatures(&store.all_for("Delhi").await.unwrap()), vec![10.0, 20.0]);
}

#[tokio::test]
async fn ingest_rejects_unconfigured_city() {
    // ---
    let server = MockServer::start().await;
    let store = Arc::new(MemoryReadingStore::new());
    let alerts = Arc::new(AlertEvaluator::new(100));
    alerts.set_threshold("Elsewhere", 0.0);

    let registry = CityRegistry::from_names(&["TestCity"]).unwrap();
    let poller = scheduler(&server, registry, store.clone(), alerts.clone(), Duration::from_secs(300));

    let reading = WeatherReading::now("Elsewhere", "Clear", 20.0, 20.0);
    let err = poller.ingest(&reading).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)), "{err:?}");
    assert!(store.all_for("Elsewhere").await.unwrap().is_empty());
    assert!(alerts.alerts_for("Elsewhere").is_empty());
}
