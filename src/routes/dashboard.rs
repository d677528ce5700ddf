// src/routes/dashboard.rs
//! `GET /api/dashboard`: everything the dashboard page renders, in one call.
//!
//! The handler fetches the upstream series (plus the optional downstream
//! comparison station) and the wind forecast concurrently, then hands the
//! raw outcomes to [`build_report`], which is pure and runs the pipeline.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::AppState;
use crate::config::{Config, ModelProfile};
use crate::models::{
    CumulativeWindEnergy, DropEvent, Observation, Prediction, RawObservation, RawWindSample,
    Resolution, RiskAssessment, TimeSeries, TimeWindow,
};
use crate::pipeline::{
    change_24h, classify_risk, data_freshness, derive_signals, next_event, normalize,
    normalize_wind, predict, prediction_interval, prediction_is_stale, station_season,
    wind_outlook, ClassifierMode, DataFreshness, EventInfo, PredictionInterval, RiskInput,
    SoutherlyPoint, StationSeason, WindOutlook,
};
use crate::providers::{fetch_observations_concurrently, FetchOutcome, Location, SeriesRequest};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/dashboard", get(handler))
}

async fn handler(State(state): State<AppState>) -> impl IntoResponse {
    // ---
    info!("GET /api/dashboard - Starting pipeline");
    let now = state.clock.now();
    let cfg = &state.config;

    let window = TimeWindow::trailing_hours(now, cfg.observation_hours_back);
    let series_request = |station: &str| SeriesRequest {
        source_id: station.to_string(),
        parameter: cfg.upstream_parameter,
        resolution: Resolution::Hourly,
        window,
    };
    let mut requests = vec![series_request(&cfg.upstream_station_id)];
    if let Some(station) = &cfg.downstream_station_id {
        requests.push(series_request(station));
    }
    let location = Location {
        lat: cfg.weather_lat,
        lon: cfg.weather_lon,
    };

    // Step 1: fetch (independent, so concurrently)
    debug!("GET /api/dashboard - Step 1");
    let (mut series, wind) = tokio::join!(
        fetch_observations_concurrently(
            state.observations.clone(),
            requests,
            cfg.fetch_concurrency
        ),
        state
            .wind
            .fetch_wind_forecast(&location, cfg.forecast_days_ahead, now),
    );

    // Step 2: run the pipeline
    debug!("GET /api/dashboard - Step 2");
    let downstream = if cfg.downstream_station_id.is_some() && series.len() > 1 {
        Some(series.remove(1))
    } else {
        None
    };
    let upstream = series
        .into_iter()
        .next()
        .unwrap_or_else(|| FetchOutcome::failed("upstream fetch missing"));

    let inputs = DashboardInputs {
        upstream,
        downstream,
        wind,
    };
    let report = build_report(inputs, now, cfg, &state.profile);

    info!(
        "Pipeline complete: temperature risk {}, energy risk {}, {} diagnostics",
        report.risk.temperature.level.as_str(),
        report.risk.energy.level.as_str(),
        report.diagnostics.len()
    );
    (StatusCode::OK, Json(report)).into_response()
}

// ---

/// Raw collaborator outcomes for one dashboard run.
#[derive(Debug, Clone)]
pub struct DashboardInputs {
    pub upstream: FetchOutcome<RawObservation>,
    pub downstream: Option<FetchOutcome<RawObservation>>,
    pub wind: FetchOutcome<RawWindSample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub station_id: String,
    pub points: usize,
    pub latest: Option<Observation>,
    pub change_24h: Option<f64>,
    pub freshness: Option<DataFreshness>,
    pub observations: TimeSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionView {
    #[serde(flatten)]
    pub prediction: Prediction,
    pub interval: PredictionInterval,
    /// Data too old for an event too far away; render as unavailable.
    pub stale_data: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskPair {
    pub temperature: RiskAssessment,
    pub energy: RiskAssessment,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindSummary {
    pub outlook: Option<WindOutlook>,
    pub cumulative_energy: Option<CumulativeWindEnergy>,
    pub southerly_series: Vec<SoutherlyPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub generated_at: DateTime<Utc>,
    pub model_version: String,
    pub event: Option<EventInfo>,
    pub station_season: StationSeason,
    pub upstream: SeriesSummary,
    pub downstream: Option<SeriesSummary>,
    pub drop_event: Option<DropEvent>,
    pub prediction: Option<PredictionView>,
    /// Both schemes, unmerged; the page decides which to headline.
    pub risk: RiskPair,
    pub wind: WindSummary,
    pub diagnostics: Vec<String>,
}

fn summarize(station_id: &str, observations: TimeSeries, now: DateTime<Utc>) -> SeriesSummary {
    SeriesSummary {
        station_id: station_id.to_string(),
        points: observations.len(),
        latest: observations.latest().copied(),
        change_24h: change_24h(&observations),
        freshness: data_freshness(&observations, now),
        observations,
    }
}

/// Run the full pipeline over one set of fetch outcomes.
pub fn build_report(
    inputs: DashboardInputs,
    now: DateTime<Utc>,
    config: &Config,
    profile: &ModelProfile,
) -> DashboardReport {
    // ---
    let mut diagnostics = Vec::new();
    if let Some(e) = &inputs.upstream.error {
        diagnostics.push(format!("station {}: {}", config.upstream_station_id, e));
    }
    if let (Some(station), Some(Some(e))) = (
        &config.downstream_station_id,
        inputs.downstream.as_ref().map(|d| &d.error),
    ) {
        diagnostics.push(format!("station {}: {}", station, e));
    }
    if let Some(e) = &inputs.wind.error {
        diagnostics.push(format!("wind forecast: {}", e));
    }

    let obs_window = TimeWindow::trailing_hours(now, config.observation_hours_back);
    let quality = Some(profile.accepted_quality.as_slice());
    let upstream = normalize(&inputs.upstream.items, &obs_window, quality);
    let downstream = inputs
        .downstream
        .as_ref()
        .map(|d| normalize(&d.items, &obs_window, quality));

    // Met.no's first step is the start of the current hour.
    let wind_window = TimeWindow::new(
        now - Duration::hours(1),
        now + Duration::days(config.forecast_days_ahead),
    );
    let wind = normalize_wind(&inputs.wind.items, &wind_window);

    let signals = derive_signals(&upstream, &wind, profile);
    let outlook = wind_outlook(&wind, now, profile);
    let southerly_risk = outlook.is_some_and(|o| o.southerly_risk);

    let event = next_event(now, config.event_year);
    let prediction = event.and_then(|e| predict(&upstream, e.start, now, profile));
    let freshness = data_freshness(&upstream, now);
    let stale_data = match (&freshness, &event) {
        (Some(f), Some(e)) => prediction_is_stale(f, e),
        _ => false,
    };

    let energy = (!wind.is_empty()).then_some(signals.cumulative_energy);
    let risk = RiskPair {
        temperature: classify_risk(
            &RiskInput::from_prediction(prediction.as_ref(), southerly_risk),
            ClassifierMode::Temperature,
            profile,
        ),
        energy: match &energy {
            Some(e) => classify_risk(&RiskInput::from_energy(e), ClassifierMode::Energy, profile),
            None => classify_risk(&RiskInput::default(), ClassifierMode::Energy, profile),
        },
    };

    let downstream_summary = match (&config.downstream_station_id, downstream) {
        (Some(station), Some(series)) => Some(summarize(station, series, now)),
        _ => None,
    };

    DashboardReport {
        generated_at: now,
        model_version: profile.version.clone(),
        event,
        station_season: station_season(now),
        upstream: summarize(&config.upstream_station_id, upstream, now),
        downstream: downstream_summary,
        drop_event: signals.drop_event,
        prediction: prediction.map(|p| PredictionView {
            interval: prediction_interval(&p, profile),
            prediction: p,
            stale_data,
        }),
        risk,
        wind: WindSummary {
            outlook,
            cumulative_energy: energy,
            southerly_series: signals.southerly_series,
        },
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::RiskLevel;
    use chrono::TimeZone;
    use std::net::SocketAddr;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 31, 7, 30, 0).unwrap()
    }

    fn config() -> Config {
        Config {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            nve_api_key: Some("key".into()),
            nve_base_url: "http://localhost".into(),
            met_base_url: "http://localhost".into(),
            user_agent: "test".into(),
            http_timeout: std::time::Duration::from_secs(5),
            upstream_station_id: "2.410.0".into(),
            downstream_station_id: None,
            upstream_parameter: 1003,
            observation_hours_back: 72,
            weather_lat: 60.4,
            weather_lon: 11.2,
            forecast_days_ahead: 7,
            observation_cache_ttl: std::time::Duration::from_secs(3600),
            forecast_cache_ttl: std::time::Duration::from_secs(21600),
            cache_max_entries: 16,
            fetch_concurrency: 4,
            event_year: None,
        }
    }

    fn hourly_temps(hours_back: i64, value: f64) -> Vec<RawObservation> {
        (0..hours_back)
            .map(|h| RawObservation {
                time: Some((now() - Duration::hours(hours_back - h)).to_rfc3339()),
                value: Some(value),
                quality: Some(1),
            })
            .collect()
    }

    fn hourly_wind(hours: i64, speed: f64, direction: f64) -> Vec<RawWindSample> {
        (0..hours)
            .map(|h| RawWindSample {
                time: Some((now() + Duration::hours(h)).to_rfc3339()),
                wind_speed: Some(speed),
                wind_direction: Some(direction),
            })
            .collect()
    }

    #[test]
    fn test_warm_calm_conditions() {
        // ---
        let inputs = DashboardInputs {
            upstream: FetchOutcome::ok(hourly_temps(72, 19.0)),
            downstream: None,
            wind: FetchOutcome::ok(hourly_wind(72, 3.0, 0.0)),
        };
        let report = build_report(inputs, now(), &config(), &ModelProfile::default());

        assert!(report.diagnostics.is_empty());
        assert_eq!(report.upstream.points, 72);
        let prediction = report.prediction.expect("prediction");
        assert!((prediction.prediction.predicted_temp - 19.0).abs() < 1e-9);
        assert!(!prediction.stale_data);
        assert_eq!(report.risk.temperature.level, RiskLevel::Good);
        assert_eq!(report.risk.energy.level, RiskLevel::Low);
        assert!(report.drop_event.is_none());
        assert_eq!(report.station_season, StationSeason::Active);
    }

    #[test]
    fn test_provider_failures_degrade_to_unknown() {
        // ---
        let inputs = DashboardInputs {
            upstream: FetchOutcome::failed("HTTP 503"),
            downstream: None,
            wind: FetchOutcome::failed("timeout"),
        };
        let report = build_report(inputs, now(), &config(), &ModelProfile::default());

        assert_eq!(report.diagnostics.len(), 2);
        assert!(report.diagnostics[0].contains("2.410.0"));
        assert!(report.prediction.is_none());
        assert_eq!(report.risk.temperature.level, RiskLevel::Unknown);
        assert_eq!(report.risk.energy.level, RiskLevel::Unknown);
        assert!(report.wind.outlook.is_none());
    }

    #[test]
    fn test_wind_failure_keeps_temperature_prediction() {
        // ---
        let inputs = DashboardInputs {
            upstream: FetchOutcome::ok(hourly_temps(72, 15.0)),
            downstream: None,
            wind: FetchOutcome::failed("timeout"),
        };
        let report = build_report(inputs, now(), &config(), &ModelProfile::default());

        assert_eq!(report.risk.temperature.level, RiskLevel::Moderate);
        assert_eq!(report.risk.energy.level, RiskLevel::Unknown);
    }

    #[test]
    fn test_southerly_outlook_raises_temperature_risk() {
        // ---
        let inputs = DashboardInputs {
            upstream: FetchOutcome::ok(hourly_temps(72, 19.0)),
            downstream: None,
            wind: FetchOutcome::ok(hourly_wind(72, 2.5, 190.0)),
        };
        let report = build_report(inputs, now(), &config(), &ModelProfile::default());

        let outlook = report.wind.outlook.unwrap();
        assert!(outlook.southerly_risk);
        assert!(outlook.upwelling_warning);
        assert_eq!(report.risk.temperature.level, RiskLevel::Moderate);
        // 72h of 2.5 m/s southerly: 180 m·h over 72 h.
        assert_eq!(report.risk.energy.level, RiskLevel::High);
    }

    #[test]
    fn test_downstream_station_summarized() {
        // ---
        let cfg = Config {
            downstream_station_id: Some("2.17.0".into()),
            ..config()
        };
        let inputs = DashboardInputs {
            upstream: FetchOutcome::ok(hourly_temps(72, 19.0)),
            downstream: Some(FetchOutcome::ok(hourly_temps(30, 17.5))),
            wind: FetchOutcome::ok(Vec::new()),
        };
        let report = build_report(inputs, now(), &cfg, &ModelProfile::default());

        let downstream = report.downstream.expect("downstream summary");
        assert_eq!(downstream.station_id, "2.17.0");
        assert_eq!(downstream.points, 30);
        assert_eq!(downstream.change_24h, Some(0.0));
    }
}
