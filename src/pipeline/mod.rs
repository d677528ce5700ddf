//! Prediction and risk pipeline.
//!
//! raw observations -> [`normalize`] -> [`derive_signals`] ->
//! {[`predict`], [`classify_risk`]} -> [`rolling_forecast`]
//!
//! Every function here is a deterministic function of its arguments. The
//! current instant and the [`crate::ModelProfile`] are always passed in.

mod event;
mod normalize;
mod predict;
mod risk;
mod rolling;
mod signals;

pub use event::{
    change_24h, data_freshness, event_start, next_event, prediction_is_stale, station_season,
    DataFreshness, EventInfo, FreshnessLevel, StationSeason,
};
pub use normalize::{normalize, normalize_wind};
pub use predict::{confidence, predict, prediction_interval, PredictionInterval};
pub use risk::{classify_risk, ClassifierMode, RiskInput};
pub use rolling::{rolling_forecast, DEFAULT_HORIZON_DAYS, DEFAULT_WINDOW_DAYS};
pub use signals::{
    cumulative_energy, derive_signals, detect_drop, southerly_component, southerly_series,
    wind_outlook, DerivedSignals, SoutherlyPoint, WindOutlook,
};
