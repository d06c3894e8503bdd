use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::info;

use crate::{AppResult, AppState, DailySummary};

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/daily-summary/{city}", get(handler))
}

async fn handler(
    Path(city): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<DailySummary>> {
    // ---
    info!("GET /daily-summary/{}", city);
    Ok(Json(state.analyzer.summarize(&city).await?))
}
