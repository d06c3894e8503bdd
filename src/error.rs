//! Error taxonomy for the `codemetal-weatherwatch` service.
//!
//! Every core component returns [`AppError`]. The poll loop logs and drops these
//! per city; the HTTP layer turns them into JSON error responses through the
//! [`IntoResponse`] impl below.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

// ---

#[derive(Error, Debug)]
pub enum AppError {
    // ---
    /// Malformed settings, fatal when raised at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The provider answered with a non-success status.
    #[error("Failed to fetch weather for {city}: status {status}, body: {body}")]
    WeatherFetch {
        city: String,
        status: u16,
        body: String,
    },

    /// The provider could not be reached or its payload could not be decoded.
    #[error("Weather request for {city} failed: {source}")]
    WeatherRequest {
        city: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Chart rendering failed: {0}")]
    Chart(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl AppError {
    // ---
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        // ---
        match self {
            AppError::Configuration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR"),
            AppError::WeatherFetch { status: 404, .. } => (StatusCode::NOT_FOUND, "CITY_NOT_FOUND"),
            AppError::WeatherFetch { .. } => (StatusCode::BAD_GATEWAY, "WEATHER_FETCH_ERROR"),
            AppError::WeatherRequest { .. } => (StatusCode::BAD_GATEWAY, "WEATHER_REQUEST_ERROR"),
            AppError::Storage(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_ERROR"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Chart(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CHART_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        let (status, code) = self.status_and_code();

        // Database internals stay in the log, not in the response body
        let message = match &self {
            AppError::Storage(_) => "A storage error occurred".to_string(),
            other => other.to_string(),
        };

        tracing::error!("Request failed ({}): {:?}", code, self);

        (
            status,
            Json(ErrorResponse {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response()
    }
}
