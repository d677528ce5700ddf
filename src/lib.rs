//! Water temperature risk prediction for the Glommadyppen swim venue.
//!
//! Upstream river temperature (NVE HydAPI) and lake wind forecasts (Met.no)
//! are normalized, turned into derived signals, propagated downstream with a
//! travel-time/dilution model and classified into risk levels.
//!
//! Module boundaries (EMBP):
//! - `pipeline`: the pure prediction and risk core
//! - `providers`: HTTP collaborators, TTL cache, concurrent fetch
//! - `routes`: the JSON API consumed by the dashboard
//! - `config`, `clock`, `models`: shared by all of the above

mod clock;
mod config;
mod models;

pub mod pipeline;
pub mod providers;
pub mod routes;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{load_from_env, Config, ConfigError, DirectionBand, ModelProfile};

// Re-exported for main.rs and the integration tests; inside the crate the
// modules import from `crate::models` / `crate::config` directly.
pub use models::{
    parse_timestamp, CumulativeWindEnergy, DailyRiskEntry, DropEvent, Observation, Prediction,
    RawObservation, RawWindSample, Resolution, RiskAssessment, RiskLevel, TimeSeries, TimeWindow,
    WindSample,
};
