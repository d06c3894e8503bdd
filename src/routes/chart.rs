use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::info;

use crate::chart::{render_temperature_chart, render_temperature_comparison};
use crate::{AppError, AppResult, AppState};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/chart/temperature/{city}", get(temperature))
        .route("/chart/temperature-comparison", get(comparison))
}

#[derive(Debug, Deserialize)]
struct ComparisonParams {
    /// Comma-separated city names.
    cities: Option<String>,
}

async fn temperature(Path(city): Path<String>, State(state): State<AppState>) -> AppResult<Response> {
    // ---
    info!("GET /chart/temperature/{}", city);

    let readings = state.store.all_for(&city).await?;
    let png = render_off_thread(move || render_temperature_chart(&city, &readings)).await?;

    Ok(png_response(png))
}

async fn comparison(
    Query(params): Query<ComparisonParams>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    // ---
    let cities = parse_cities(params.cities.as_deref())?;
    info!("GET /chart/temperature-comparison cities={:?}", cities);

    let mut series = Vec::with_capacity(cities.len());
    for city in cities {
        let readings = state.store.all_for(&city).await?;
        series.push((city, readings));
    }
    let png = render_off_thread(move || render_temperature_comparison(&series)).await?;

    Ok(png_response(png))
}

/// Rasterizing is CPU-bound; keep it off the async workers.
async fn render_off_thread<F>(render: F) -> AppResult<Vec<u8>>
where
    F: FnOnce() -> AppResult<Vec<u8>> + Send + 'static,
{
    tokio::task::spawn_blocking(render)
        .await
        .map_err(|e| AppError::Chart(format!("render task failed: {e}")))?
}

fn png_response(png: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], png).into_response()
}

fn parse_cities(raw: Option<&str>) -> AppResult<Vec<String>> {
    // ---
    let mut cities: Vec<String> = Vec::new();
    for name in raw.unwrap_or_default().split(',').map(str::trim) {
        if !name.is_empty() && !cities.iter().any(|c| c == name) {
            cities.push(name.to_string());
        }
    }

    if cities.is_empty() {
        return Err(AppError::Validation("cities must name at least one city".into()));
    }
    Ok(cities)
}
