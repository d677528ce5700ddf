// src/routes/rolling.rs
//! `GET /api/rolling`: day-by-day energy-scheme risk over the forecast.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::AppState;
use crate::models::{DailyRiskEntry, TimeWindow};
use crate::pipeline::{normalize_wind, rolling_forecast, DEFAULT_HORIZON_DAYS, DEFAULT_WINDOW_DAYS};
use crate::providers::Location;

const MAX_HORIZON_DAYS: u32 = 60;
const MAX_WINDOW_DAYS: u32 = 14;

#[derive(Debug, Deserialize)]
struct RollingParams {
    horizon_days: Option<u32>,
    window_days: Option<u32>,
}

impl RollingParams {
    /// Resolve defaults and check ranges, returning `(horizon, window)`.
    fn resolve(&self) -> Result<(u32, u32), String> {
        let horizon = self.horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS);
        let window = self.window_days.unwrap_or(DEFAULT_WINDOW_DAYS);
        if !(1..=MAX_HORIZON_DAYS).contains(&horizon) {
            return Err(format!(
                "horizon_days must be between 1 and {MAX_HORIZON_DAYS}, got {horizon}"
            ));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&window) {
            return Err(format!(
                "window_days must be between 1 and {MAX_WINDOW_DAYS}, got {window}"
            ));
        }
        Ok((horizon, window))
    }
}

#[derive(Debug, Serialize)]
struct RollingResponse {
    generated_at: DateTime<Utc>,
    model_version: String,
    horizon_days: u32,
    window_days: u32,
    entries: Vec<DailyRiskEntry>,
    diagnostics: Vec<String>,
}

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/rolling", get(handler))
}

async fn handler(
    State(state): State<AppState>,
    Query(params): Query<RollingParams>,
) -> impl IntoResponse {
    // ---
    let (horizon_days, window_days) = match params.resolve() {
        Ok(v) => v,
        Err(reason) => {
            warn!("GET /api/rolling - rejected: {}", reason);
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response();
        }
    };
    info!(
        "GET /api/rolling - horizon {} days, window {} days",
        horizon_days, window_days
    );

    let now = state.clock.now();
    let cfg = &state.config;
    let location = Location {
        lat: cfg.weather_lat,
        lon: cfg.weather_lon,
    };
    let outcome = state
        .wind
        .fetch_wind_forecast(&location, i64::from(horizon_days), now)
        .await;

    let wind_window = TimeWindow::new(
        now - Duration::hours(1),
        now + Duration::days(i64::from(horizon_days)),
    );
    let wind = normalize_wind(&outcome.items, &wind_window);
    let entries = rolling_forecast(&wind, now, horizon_days, window_days, &state.profile);

    let diagnostics: Vec<String> = outcome
        .error
        .into_iter()
        .map(|e| format!("wind forecast: {}", e))
        .collect();

    info!(
        "Rolling forecast complete: {} of {} days classified",
        entries.len(),
        horizon_days
    );
    let body = RollingResponse {
        generated_at: now,
        model_version: state.profile.version.clone(),
        horizon_days,
        window_days,
        entries,
        diagnostics,
    };
    (StatusCode::OK, Json(body)).into_response()
}
