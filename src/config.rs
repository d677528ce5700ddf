//! Configuration loader for the `glomma-swimrisk` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Two structures come out of it:
//! - [`Config`]: service wiring (listen address, provider URLs, cache TTLs)
//! - [`ModelProfile`]: tuning parameters of the prediction and risk model,
//!   passed explicitly into every core call so a test can swap the profile
//!
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

// ---

/// Invalid configuration. Always fatal at startup.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Parse an optional environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        match env::var($var_name) {
            Ok(v) => v.trim().parse::<$ty>().map_err(|e| ConfigError::Invalid {
                name: $var_name,
                reason: e.to_string(),
            })?,
            Err(_) => $default,
        }
    };
}

/// Read an optional string environment variable, falling back to a default.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.into(),
    }
}

/// `****` followed by the last four characters of `key`.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// Strongly typed service configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Socket address the HTTP server binds to.
    pub listen_addr: SocketAddr,

    /// NVE HydAPI key. Without it the observation provider reports an error.
    pub nve_api_key: Option<String>,

    /// NVE HydAPI base URL.
    pub nve_base_url: String,

    /// Met.no locationforecast base URL.
    pub met_base_url: String,

    /// User-Agent sent to both providers (Met.no rejects anonymous clients).
    pub user_agent: String,

    /// Per-request timeout for provider calls.
    pub http_timeout: Duration,

    /// Upstream temperature station (Vorma at Funnefoss).
    pub upstream_station_id: String,

    /// Optional measured station near the venue, shown next to the prediction.
    pub downstream_station_id: Option<String>,

    /// HydAPI parameter code for water temperature.
    pub upstream_parameter: u32,

    /// How far back to request observations.
    pub observation_hours_back: i64,

    /// Wind forecast location (Mjøsa).
    pub weather_lat: f64,
    pub weather_lon: f64,

    /// Forecast horizon requested from Met.no.
    pub forecast_days_ahead: i64,

    pub observation_cache_ttl: Duration,
    pub forecast_cache_ttl: Duration,
    pub cache_max_entries: usize,

    /// Upper bound on concurrent provider fetches.
    pub fetch_concurrency: usize,

    /// Pin the event to a given year instead of "next upcoming".
    pub event_year: Option<i32>,
}

/// Load service configuration from environment variables with defaults.
///
/// Optional:
/// - `LISTEN_ADDR` – bind address (default: `0.0.0.0:8080`)
/// - `NVE_API_KEY` – HydAPI key (no default)
/// - `NVE_BASE_URL`, `MET_BASE_URL` – provider base URLs
/// - `HTTP_USER_AGENT`, `HTTP_TIMEOUT_SECS` – client settings
/// - `UPSTREAM_STATION_ID`, `UPSTREAM_PARAMETER`, `OBSERVATION_HOURS_BACK`
/// - `DOWNSTREAM_STATION_ID` – e.g. `2.17.0` (Blaker); unset disables it
/// - `WEATHER_LAT`, `WEATHER_LON`, `FORECAST_DAYS_AHEAD`
/// - `OBSERVATION_CACHE_TTL_SECS`, `FORECAST_CACHE_TTL_SECS`, `CACHE_MAX_ENTRIES`
/// - `FETCH_CONCURRENCY` – 1..=8 (default: 4)
/// - `EVENT_YEAR`
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config, ConfigError> {
    // ---
    let listen_addr = parse_env!("LISTEN_ADDR", SocketAddr, SocketAddr::from(([0, 0, 0, 0], 8080)));
    let nve_api_key = env::var("NVE_API_KEY").ok().filter(|k| !k.trim().is_empty());
    let nve_base_url = env_or!("NVE_BASE_URL", "https://hydapi.nve.no/api/v1");
    let met_base_url = env_or!(
        "MET_BASE_URL",
        "https://api.met.no/weatherapi/locationforecast/2.0"
    );
    let user_agent = env_or!("HTTP_USER_AGENT", "GlommadyppenApp/1.0");
    let http_timeout = Duration::from_secs(parse_env!("HTTP_TIMEOUT_SECS", u64, 30));

    let upstream_station_id = env_or!("UPSTREAM_STATION_ID", "2.410.0");
    let downstream_station_id = env::var("DOWNSTREAM_STATION_ID")
        .ok()
        .filter(|id| !id.trim().is_empty());
    let upstream_parameter = parse_env!("UPSTREAM_PARAMETER", u32, 1003);
    let observation_hours_back = parse_env!("OBSERVATION_HOURS_BACK", i64, 72);

    let weather_lat = parse_env!("WEATHER_LAT", f64, 60.403489);
    let weather_lon = parse_env!("WEATHER_LON", f64, 11.230855);
    let forecast_days_ahead = parse_env!("FORECAST_DAYS_AHEAD", i64, 7);

    let observation_cache_ttl =
        Duration::from_secs(parse_env!("OBSERVATION_CACHE_TTL_SECS", u64, 3600));
    let forecast_cache_ttl = Duration::from_secs(parse_env!("FORECAST_CACHE_TTL_SECS", u64, 21600));
    let cache_max_entries = parse_env!("CACHE_MAX_ENTRIES", usize, 64);
    let fetch_concurrency = parse_env!("FETCH_CONCURRENCY", usize, 4);

    let event_year = match env::var("EVENT_YEAR") {
        Ok(v) => Some(v.trim().parse::<i32>().map_err(|e| invalid("EVENT_YEAR", e.to_string()))?),
        Err(_) => None,
    };

    let cfg = Config {
        listen_addr,
        nve_api_key,
        nve_base_url,
        met_base_url,
        user_agent,
        http_timeout,
        upstream_station_id,
        downstream_station_id,
        upstream_parameter,
        observation_hours_back,
        weather_lat,
        weather_lon,
        forecast_days_ahead,
        observation_cache_ttl,
        forecast_cache_ttl,
        cache_max_entries,
        fetch_concurrency,
        event_year,
    };
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    /// Reject values that would make the fetch layer misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // ---
        if !(1..=8).contains(&self.fetch_concurrency) {
            return Err(invalid("FETCH_CONCURRENCY", "must be between 1 and 8"));
        }
        if self.observation_hours_back <= 0 {
            return Err(invalid("OBSERVATION_HOURS_BACK", "must be positive"));
        }
        if self.forecast_days_ahead <= 0 {
            return Err(invalid("FORECAST_DAYS_AHEAD", "must be positive"));
        }
        if !(-90.0..=90.0).contains(&self.weather_lat) {
            return Err(invalid("WEATHER_LAT", "must be within [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&self.weather_lon) {
            return Err(invalid("WEATHER_LON", "must be within [-180, 180]"));
        }
        if self.cache_max_entries == 0 {
            return Err(invalid("CACHE_MAX_ENTRIES", "must be at least 1"));
        }
        Ok(())
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the API key while showing all other values that were loaded.
    pub fn log_config(&self) {
        // ---
        let masked_key = match &self.nve_api_key {
            Some(key) => mask_key(key),
            None => "(not set)".to_string(),
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  LISTEN_ADDR          : {}", self.listen_addr);
        tracing::info!("  NVE_API_KEY          : {}", masked_key);
        tracing::info!("  NVE_BASE_URL         : {}", self.nve_base_url);
        tracing::info!("  MET_BASE_URL         : {}", self.met_base_url);
        tracing::info!("  UPSTREAM_STATION_ID  : {}", self.upstream_station_id);
        if let Some(id) = &self.downstream_station_id {
            tracing::info!("  DOWNSTREAM_STATION_ID: {}", id);
        }
        tracing::info!("  UPSTREAM_PARAMETER   : {}", self.upstream_parameter);
        tracing::info!("  WEATHER_LAT/LON      : {}, {}", self.weather_lat, self.weather_lon);
        tracing::info!("  FETCH_CONCURRENCY    : {}", self.fetch_concurrency);
        tracing::info!(
            "  CACHE TTL obs/fcst   : {}s / {}s",
            self.observation_cache_ttl.as_secs(),
            self.forecast_cache_ttl.as_secs()
        );
        if let Some(year) = self.event_year {
            tracing::info!("  EVENT_YEAR           : {}", year);
        }
    }
}

// ---

/// Closed-open compass band `[from_deg, to_deg)` in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectionBand {
    pub from_deg: f64,
    pub to_deg: f64,
}

impl DirectionBand {
    pub fn contains(&self, direction_deg: f64) -> bool {
        direction_deg >= self.from_deg && direction_deg < self.to_deg
    }
}

/// Tunable parameters of the propagation model and both risk schemes.
///
/// The thresholds were fit against historical cold-water events and have
/// drifted between dashboard iterations, so they live here as one versioned
/// profile instead of as constants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelProfile {
    // ---
    pub version: String,

    /// Transit delay from the upstream station to the venue.
    pub travel_time_hours: f64,
    /// Fraction of an upstream anomaly that survives the confluence.
    pub survival_rate: f64,
    /// Trailing window for the baseline mean.
    pub baseline_hours: i64,
    /// Hourly points expected in a full observation window.
    pub expected_points: usize,
    /// Quality codes retained by the normalizer.
    pub accepted_quality: Vec<i32>,

    pub southerly_band: DirectionBand,

    // Cumulative-energy scheme
    pub high_energy_threshold: f64,
    pub moderate_energy_threshold: f64,
    pub high_hours_threshold: f64,
    pub moderate_hours_threshold: f64,

    // Temperature/anomaly scheme
    pub high_temp_c: f64,
    pub moderate_temp_c: f64,
    pub low_temp_c: f64,
    pub high_anomaly_c: f64,
    pub moderate_anomaly_c: f64,
    pub southerly_risk_speed: f64,
    pub southerly_lookahead_hours: i64,

    /// Mean southerly speed that triggers an upwelling warning.
    pub critical_wind_speed: f64,

    pub drop_threshold_c: f64,
    pub drop_window_hours: i64,

    /// Standard error from model validation, used for the 95% interval.
    pub model_std_error_c: f64,
}

impl Default for ModelProfile {
    fn default() -> Self {
        Self {
            version: "2024-12".to_string(),
            travel_time_hours: 25.0,
            survival_rate: 0.14,
            baseline_hours: 48,
            expected_points: 72,
            accepted_quality: vec![1, 2],
            southerly_band: DirectionBand {
                from_deg: 135.0,
                to_deg: 225.0,
            },
            high_energy_threshold: 150.0,
            moderate_energy_threshold: 100.0,
            high_hours_threshold: 20.0,
            moderate_hours_threshold: 15.0,
            high_temp_c: 14.0,
            moderate_temp_c: 16.0,
            low_temp_c: 18.0,
            high_anomaly_c: -3.0,
            moderate_anomaly_c: -2.0,
            southerly_risk_speed: 1.5,
            southerly_lookahead_hours: 48,
            critical_wind_speed: 1.9,
            drop_threshold_c: 2.0,
            drop_window_hours: 6,
            model_std_error_c: 2.0,
        }
    }
}

impl ModelProfile {
    /// Load the profile, applying `MODEL_*` overrides on top of the defaults.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        // ---
        let d = Self::default();
        let accepted_quality = match env::var("MODEL_ACCEPTED_QUALITY") {
            Ok(v) => v
                .split(',')
                .map(|code| code.trim().parse::<i32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| invalid("MODEL_ACCEPTED_QUALITY", e.to_string()))?,
            Err(_) => d.accepted_quality,
        };

        let profile = Self {
            version: env_or!("MODEL_VERSION", d.version),
            travel_time_hours: parse_env!("MODEL_TRAVEL_TIME_HOURS", f64, d.travel_time_hours),
            survival_rate: parse_env!("MODEL_SURVIVAL_RATE", f64, d.survival_rate),
            baseline_hours: parse_env!("MODEL_BASELINE_HOURS", i64, d.baseline_hours),
            expected_points: parse_env!("MODEL_EXPECTED_POINTS", usize, d.expected_points),
            accepted_quality,
            southerly_band: DirectionBand {
                from_deg: parse_env!("MODEL_SOUTHERLY_FROM_DEG", f64, d.southerly_band.from_deg),
                to_deg: parse_env!("MODEL_SOUTHERLY_TO_DEG", f64, d.southerly_band.to_deg),
            },
            high_energy_threshold: parse_env!("MODEL_HIGH_ENERGY", f64, d.high_energy_threshold),
            moderate_energy_threshold: parse_env!(
                "MODEL_MODERATE_ENERGY",
                f64,
                d.moderate_energy_threshold
            ),
            high_hours_threshold: parse_env!("MODEL_HIGH_HOURS", f64, d.high_hours_threshold),
            moderate_hours_threshold: parse_env!(
                "MODEL_MODERATE_HOURS",
                f64,
                d.moderate_hours_threshold
            ),
            high_temp_c: parse_env!("MODEL_HIGH_TEMP_C", f64, d.high_temp_c),
            moderate_temp_c: parse_env!("MODEL_MODERATE_TEMP_C", f64, d.moderate_temp_c),
            low_temp_c: parse_env!("MODEL_LOW_TEMP_C", f64, d.low_temp_c),
            high_anomaly_c: parse_env!("MODEL_HIGH_ANOMALY_C", f64, d.high_anomaly_c),
            moderate_anomaly_c: parse_env!("MODEL_MODERATE_ANOMALY_C", f64, d.moderate_anomaly_c),
            southerly_risk_speed: parse_env!(
                "MODEL_SOUTHERLY_RISK_SPEED",
                f64,
                d.southerly_risk_speed
            ),
            southerly_lookahead_hours: parse_env!(
                "MODEL_SOUTHERLY_LOOKAHEAD_HOURS",
                i64,
                d.southerly_lookahead_hours
            ),
            critical_wind_speed: parse_env!(
                "MODEL_CRITICAL_WIND_SPEED",
                f64,
                d.critical_wind_speed
            ),
            drop_threshold_c: parse_env!("MODEL_DROP_THRESHOLD_C", f64, d.drop_threshold_c),
            drop_window_hours: parse_env!("MODEL_DROP_WINDOW_HOURS", i64, d.drop_window_hours),
            model_std_error_c: parse_env!("MODEL_STD_ERROR_C", f64, d.model_std_error_c),
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Check the profile for programming/configuration mistakes.
    ///
    /// Missing data is never an error anywhere in the pipeline; a profile
    /// that makes the model meaningless is.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // ---
        if !(self.travel_time_hours.is_finite() && self.travel_time_hours > 0.0) {
            return Err(invalid("travel_time_hours", "must be a positive number of hours"));
        }
        if !(0.0..=1.0).contains(&self.survival_rate) {
            return Err(invalid("survival_rate", "must be within [0, 1]"));
        }
        if self.baseline_hours <= 0 {
            return Err(invalid("baseline_hours", "must be positive"));
        }
        if self.expected_points == 0 {
            return Err(invalid("expected_points", "must be at least 1"));
        }
        let band = self.southerly_band;
        if !(0.0..=360.0).contains(&band.from_deg)
            || !(0.0..=360.0).contains(&band.to_deg)
            || band.from_deg >= band.to_deg
        {
            return Err(invalid("southerly_band", "must satisfy 0 <= from < to <= 360"));
        }
        let thresholds = [
            ("high_energy_threshold", self.high_energy_threshold),
            ("moderate_energy_threshold", self.moderate_energy_threshold),
            ("high_hours_threshold", self.high_hours_threshold),
            ("moderate_hours_threshold", self.moderate_hours_threshold),
            ("high_temp_c", self.high_temp_c),
            ("moderate_temp_c", self.moderate_temp_c),
            ("low_temp_c", self.low_temp_c),
            ("high_anomaly_c", self.high_anomaly_c),
            ("moderate_anomaly_c", self.moderate_anomaly_c),
            ("southerly_risk_speed", self.southerly_risk_speed),
            ("critical_wind_speed", self.critical_wind_speed),
            ("drop_threshold_c", self.drop_threshold_c),
            ("model_std_error_c", self.model_std_error_c),
        ];
        if let Some(&(name, _)) = thresholds.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(name, "must be a finite number"));
        }
        if self.moderate_energy_threshold <= 0.0
            || self.high_energy_threshold < self.moderate_energy_threshold
        {
            return Err(invalid("energy thresholds", "need 0 < moderate <= high"));
        }
        if self.moderate_hours_threshold <= 0.0
            || self.high_hours_threshold < self.moderate_hours_threshold
        {
            return Err(invalid("hours thresholds", "need 0 < moderate <= high"));
        }
        if !(self.high_temp_c <= self.moderate_temp_c && self.moderate_temp_c <= self.low_temp_c) {
            return Err(invalid("temperature thresholds", "need high <= moderate <= low"));
        }
        if self.high_anomaly_c > self.moderate_anomaly_c {
            return Err(invalid("anomaly thresholds", "need high <= moderate"));
        }
        if self.drop_threshold_c <= 0.0 || self.drop_window_hours <= 0 {
            return Err(invalid("drop detection", "threshold and window must be positive"));
        }
        if self.southerly_lookahead_hours <= 0 {
            return Err(invalid("southerly_lookahead_hours", "must be positive"));
        }
        if self.model_std_error_c < 0.0 {
            return Err(invalid("model_std_error_c", "must not be negative"));
        }
        Ok(())
    }

    pub fn log_profile(&self) {
        tracing::info!(
            "Model profile {}: travel {}h, survival {}, band [{}, {})",
            self.version,
            self.travel_time_hours,
            self.survival_rate,
            self.southerly_band.from_deg,
            self.southerly_band.to_deg,
        );
        tracing::info!(
            "  energy {}/{} m·h, hours {}/{}",
            self.moderate_energy_threshold,
            self.high_energy_threshold,
            self.moderate_hours_threshold,
            self.high_hours_threshold,
        );
    }
}
