use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Alert, AppError, AppResult, AppState};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/set-alert-threshold", post(set_threshold))
        .route("/alerts/{city}", get(list_alerts))
}

/// Raw query parameters; validated by hand so bad input surfaces as a
/// `VALIDATION_ERROR` body instead of an extractor rejection.
#[derive(Debug, Deserialize)]
struct ThresholdParams {
    threshold: Option<String>,
    city: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

async fn set_threshold(
    Query(params): Query<ThresholdParams>,
    State(state): State<AppState>,
) -> AppResult<Json<MessageResponse>> {
    // ---
    let (city, threshold) = validate(&params)?;
    info!("POST /set-alert-threshold city={} threshold={}", city, threshold);

    state.alerts.set_threshold(&city, threshold);
    Ok(Json(MessageResponse {
        message: format!("Alert threshold set to {threshold:?}°C for {city}"),
    }))
}

async fn list_alerts(Path(city): Path<String>, State(state): State<AppState>) -> Json<Vec<Alert>> {
    // ---
    info!("GET /alerts/{}", city);
    Json(state.alerts.alerts_for(&city))
}

fn validate(params: &ThresholdParams) -> AppResult<(String, f64)> {
    // ---
    let city = params
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("city is required".into()))?;

    let raw = params
        .threshold
        .as_deref()
        .ok_or_else(|| AppError::Validation("threshold is required".into()))?;
    let threshold = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite())
        .ok_or_else(|| AppError::Validation(format!("threshold must be a finite number, got '{raw}'")))?;

    Ok((city.to_string(), threshold))
}
