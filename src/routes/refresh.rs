// src/routes/refresh.rs
//! `POST /api/refresh`: drop every cached provider response so the next
//! dashboard request fetches fresh data.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::Serialize;
use tracing::info;

use super::AppState;

#[derive(Serialize)]
struct RefreshResponse {
    cleared_observations: usize,
    cleared_forecasts: usize,
}

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/refresh", post(handler))
}

async fn handler(State(state): State<AppState>) -> impl IntoResponse {
    // ---
    let cleared_observations = state.observation_cache.len().await;
    let cleared_forecasts = state.forecast_cache.len().await;
    state.observation_cache.clear().await;
    state.forecast_cache.clear().await;

    info!(
        "POST /api/refresh - cleared {} observation and {} forecast entries",
        cleared_observations, cleared_forecasts
    );
    (
        StatusCode::OK,
        Json(RefreshResponse {
            cleared_observations,
            cleared_forecasts,
        }),
    )
        .into_response()
}
