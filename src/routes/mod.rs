use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

mod alerts;
mod chart;
mod current_weather;
mod daily_summary;
mod health;

// ---

pub fn router(state: AppState) -> Router {
    // ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(current_weather::router())
        .merge(daily_summary::router())
        .merge(alerts::router())
        .merge(chart::router())
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
