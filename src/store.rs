//! Append-only persistence for weather readings.
//!
//! [`PgReadingStore`] backs the running service; [`MemoryReadingStore`] keeps
//! the same contract in process and is what the test suite runs against.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::models::WeatherReading;

// ---

#[async_trait]
pub trait ReadingStore: Send + Sync {
    // ---
    /// Record one reading atomically. On error the reading is lost.
    async fn save(&self, reading: &WeatherReading) -> AppResult<()>;

    /// All readings for `city` in insertion order; empty when none exist.
    async fn all_for(&self, city: &str) -> AppResult<Vec<WeatherReading>>;
}

// ---

pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    // ---
    async fn save(&self, reading: &WeatherReading) -> AppResult<()> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO weather_readings (
                city, condition, temperature, feels_like, observed_at
            ) VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&reading.city)
        .bind(&reading.condition)
        .bind(reading.temperature)
        .bind(reading.feels_like)
        .bind(reading.observed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn all_for(&self, city: &str) -> AppResult<Vec<WeatherReading>> {
        // ---
        let readings = sqlx::query_as::<_, WeatherReading>(
            r#"
            SELECT city, condition, temperature, feels_like, observed_at
              FROM weather_readings
             WHERE city = $1
             ORDER BY id
            "#,
        )
        .bind(city)
        .fetch_all(&self.pool)
        .await?;

        Ok(readings)
    }
}

// ---

#[derive(Default)]
pub struct MemoryReadingStore {
    readings: RwLock<HashMap<String, Vec<WeatherReading>>>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    // ---
    async fn save(&self, reading: &WeatherReading) -> AppResult<()> {
        self.readings
            .write()
            .entry(reading.city.clone())
            .or_default()
            .push(reading.clone());
        Ok(())
    }

    async fn all_for(&self, city: &str) -> AppResult<Vec<WeatherReading>> {
        Ok(self.readings.read().get(city).cloned().unwrap_or_default())
    }
}
