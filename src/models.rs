//! Data models shared by the pipeline, the provider adapters and the routes.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DirectionBand;

// ---

/// Observation record as a provider returns it, before normalization.
///
/// Every field is optional or stringly typed; the normalizer drops records
/// that cannot be turned into an [`Observation`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RawObservation {
    // ---
    pub time: Option<String>,
    pub value: Option<f64>,
    #[serde(default)]
    pub quality: Option<i32>,
}

/// One validated, UTC-stamped measurement.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Observation {
    // ---
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub quality: Option<i32>,
}

/// Simple transformation helpers
impl RawObservation {
    // ---
    /// Convert to an [`Observation`], or `None` when the time or value is
    /// missing or unparseable. Naive timestamps are taken as UTC.
    pub fn to_observation(&self) -> Option<Observation> {
        // ---
        let timestamp = parse_timestamp(self.time.as_deref()?)?;
        let value = self.value.filter(|v| v.is_finite())?;
        Some(Observation {
            timestamp,
            value,
            quality: self.quality,
        })
    }
}

/// Parse RFC 3339 (any offset) or a naive ISO-8601 timestamp assumed UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    // ---
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of `hours` ending at `end`.
    pub fn trailing_hours(end: DateTime<Utc>, hours: i64) -> Self {
        Self::new(end - Duration::hours(hours), end)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Ordered observations for one station and variable.
///
/// An empty series is a valid state meaning "no data available".
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct TimeSeries {
    observations: Vec<Observation>,
}

impl TimeSeries {
    // ---
    /// Build from observations already in ascending timestamp order.
    pub(crate) fn from_sorted(observations: Vec<Observation>) -> Self {
        debug_assert!(observations
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
        Self { observations }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Observations inside `window`, order preserved.
    pub fn within(&self, window: &TimeWindow) -> impl Iterator<Item = &Observation> {
        let window = *window;
        self.observations
            .iter()
            .filter(move |o| window.contains(o.timestamp))
    }

    /// Raw records equivalent to this series, for re-normalization.
    pub fn to_raw(&self) -> Vec<RawObservation> {
        self.observations
            .iter()
            .map(|o| RawObservation {
                time: Some(o.timestamp.to_rfc3339()),
                value: Some(o.value),
                quality: o.quality,
            })
            .collect()
    }
}

/// Wind forecast record as a provider returns it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RawWindSample {
    pub time: Option<String>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
}

/// One validated wind sample. Direction is where the wind blows *from*.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct WindSample {
    // ---
    pub timestamp: DateTime<Utc>,
    /// m/s, never negative
    pub speed: f64,
    /// degrees in `[0, 360)`
    pub direction: f64,
}

impl WindSample {
    pub fn is_southerly(&self, band: &DirectionBand) -> bool {
        band.contains(self.direction)
    }
}

/// Sampling cadence of a series, used as Δt when integrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Hourly,
    ThreeHourly,
    SixHourly,
}

impl Resolution {
    pub fn hours(self) -> f64 {
        match self {
            Resolution::Hourly => 1.0,
            Resolution::ThreeHourly => 3.0,
            Resolution::SixHourly => 6.0,
        }
    }

    /// HydAPI `ResolutionTime` value in minutes.
    pub fn minutes(self) -> u32 {
        match self {
            Resolution::Hourly => 60,
            Resolution::ThreeHourly => 180,
            Resolution::SixHourly => 360,
        }
    }

    /// Snap a sampling gap to the nearest supported cadence.
    pub fn from_gap(gap: Duration) -> Self {
        match gap.num_minutes() {
            m if m < 120 => Resolution::Hourly,
            m if m < 270 => Resolution::ThreeHourly,
            _ => Resolution::SixHourly,
        }
    }

    /// The step each ordered timestamp stands for.
    ///
    /// A sample covers the gap to the next one; the last sample reuses the
    /// gap to its predecessor. Met.no switches from hourly to 6-hourly steps
    /// mid-forecast, so one cadence per series is not enough. A lone sample
    /// is taken as hourly.
    pub fn per_sample(timestamps: &[DateTime<Utc>]) -> Vec<Self> {
        // ---
        let positive = |gap: Duration| (gap > Duration::zero()).then_some(gap);
        (0..timestamps.len())
            .map(|i| {
                let next = timestamps.get(i + 1).map(|t| *t - timestamps[i]);
                let prev = i.checked_sub(1).map(|p| timestamps[i] - timestamps[p]);
                next.and_then(positive)
                    .or_else(|| prev.and_then(positive))
                    .map_or(Resolution::Hourly, Resolution::from_gap)
            })
            .collect()
    }
}

/// Southerly wind integral over a window, in m·h.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Default)]
pub struct CumulativeWindEnergy {
    pub energy_mh: f64,
    pub hours_southerly: f64,
    /// Coarsest step in the window, 1 h when the window is empty
    pub resolution_hours: f64,
}

/// A fall of at least the configured threshold inside the trailing window.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DropEvent {
    pub magnitude: f64,
    pub max_temp: f64,
    pub min_temp: f64,
    pub max_time: DateTime<Utc>,
    pub min_time: DateTime<Utc>,
    pub duration_hours: f64,
}

/// Downstream temperature predicted from the upstream anomaly.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Prediction {
    // ---
    pub target_time: DateTime<Utc>,
    pub predicted_temp: f64,
    pub source_temp: f64,
    pub source_time: DateTime<Utc>,
    pub baseline_temp: f64,
    pub anomaly: f64,
    /// Diagnostic only, in `[0, 1]`
    pub confidence: f64,
}

/// Discrete risk level. `Good` is only produced by the temperature scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Good,
    Low,
    Moderate,
    High,
    Unknown,
}

impl RiskLevel {
    /// Rank for ordering comparisons; `None` for `Unknown`.
    pub fn severity(self) -> Option<u8> {
        match self {
            RiskLevel::Good => Some(0),
            RiskLevel::Low => Some(1),
            RiskLevel::Moderate => Some(2),
            RiskLevel::High => Some(3),
            RiskLevel::Unknown => None,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RiskLevel::High => "#dc3545",
            RiskLevel::Moderate => "#ffc107",
            RiskLevel::Low => "#17a2b8",
            RiskLevel::Good => "#28a745",
            RiskLevel::Unknown => "#6c757d",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Good => "GOOD",
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub color: &'static str,
    pub advisory: String,
}

/// Risk for one future day, produced by the rolling forecaster.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyRiskEntry {
    pub date: NaiveDate,
    pub target_time: DateTime<Utc>,
    pub samples: usize,
    pub energy: CumulativeWindEnergy,
    pub assessment: RiskAssessment,
}
