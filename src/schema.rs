//! Database schema management for `codemetal-weatherwatch`.
//!
//! Ensures the readings table and its index exist before the poll loop or the
//! HTTP server touch the database. Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the database schema (idempotent).
///
/// `weather_readings` is append-only; `id` preserves insertion order for
/// per-city queries. Safe to call on every startup.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weather_readings (
            id          BIGSERIAL        PRIMARY KEY,
            city        TEXT             NOT NULL,
            condition   TEXT             NOT NULL,
            temperature DOUBLE PRECISION NOT NULL,
            feels_like  DOUBLE PRECISION NOT NULL,
            observed_at BIGINT           NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_weather_readings_city
            ON weather_readings (city, id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
