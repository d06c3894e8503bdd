use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::info;

use crate::{AppResult, AppState, CityConfig, WeatherReading};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/current-weather/{city}", get(current_weather))
        .route("/cities", get(cities))
}

/// Fetch straight from the provider; the result is not stored.
async fn current_weather(
    Path(city): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<WeatherReading>> {
    // ---
    info!("GET /current-weather/{}", city);

    let coordinates = state.registry.coordinates_for(&city);
    let reading = state.client.fetch_current(&city, coordinates).await?;
    Ok(Json(reading))
}

async fn cities(State(state): State<AppState>) -> Json<Vec<CityConfig>> {
    Json(state.registry.cities().to_vec())
}
