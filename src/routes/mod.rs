use std::sync::Arc;

use axum::Router;

use crate::config::{Config, ModelProfile};
use crate::models::{RawObservation, RawWindSample};
use crate::providers::{ObservationSource, TtlCache, WindForecastSource};
use crate::Clock;

mod dashboard;
mod health;
mod refresh;
mod rolling;

pub use dashboard::{build_report, DashboardInputs, DashboardReport};

// ---

/// Shared application state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub profile: Arc<ModelProfile>,
    pub clock: Arc<dyn Clock>,
    pub observations: Arc<dyn ObservationSource>,
    pub wind: Arc<dyn WindForecastSource>,
    pub observation_cache: Arc<TtlCache<Vec<RawObservation>>>,
    pub forecast_cache: Arc<TtlCache<Vec<RawWindSample>>>,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(dashboard::router())
        .merge(rolling::router())
        .merge(refresh::router())
        .merge(health::router())
        .with_state(state)
}
