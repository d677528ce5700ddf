// src/routes/health.rs
//! API health check endpoint for the swim-risk service.
//!
//! This module defines the `/health` route used by container orchestrators
//! and uptime probes to verify that the service is running. It is a sibling
//! module in the `routes` directory and follows the Explicit Module Boundary
//! Pattern (EMBP):
//! - Internal to this file: endpoint handler and response type
//! - Exports to the gateway (`mod.rs`): a subrouter containing `/health`

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model_version: String,
}

/// Handle `GET /health`.
///
/// Reports the active model profile version. Never calls the data
/// providers, so a provider outage does not fail the probe.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model_version: state.profile.version.clone(),
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
