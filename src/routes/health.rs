// src/routes/health.rs
//! Liveness endpoints for the Weatherwatch backend.
//!
//! `/health` is used by container orchestrators and CI to verify that the
//! service is up and answering HTTP; `/` returns a static banner. Neither
//! touches the database, the provider or the poll loop.

use axum::{routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct BannerResponse {
    message: &'static str,
}

/// Handle `GET /health`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Handle `GET /`.
async fn root() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "Weather Monitoring System API",
    })
}

/// Create a subrouter containing `/` and `/health`.
///
/// Generic over the application state so it merges cleanly with the
/// gateway router regardless of the state type.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}
