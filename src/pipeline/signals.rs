//! Signal derivation: southerly wind decomposition, cumulative wind energy,
//! short-window temperature drops and the 48h wind outlook.
//!
//! Southerly wind over the lake piles surface water to the north and lets
//! cold bottom water well up at the outlet, which is what the energy signal
//! tracks.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::{DirectionBand, ModelProfile};
use crate::models::{
    CumulativeWindEnergy, DropEvent, Resolution, TimeSeries, TimeWindow, WindSample,
};

// ---

/// A wind sample with its southerly component.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct SoutherlyPoint {
    pub timestamp: DateTime<Utc>,
    pub speed: f64,
    pub direction: f64,
    /// `speed` when the direction is in the southerly band, else 0
    pub southerly: f64,
}

/// Everything derived from one temperature series and one wind series.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DerivedSignals {
    pub southerly_series: Vec<SoutherlyPoint>,
    pub cumulative_energy: CumulativeWindEnergy,
    pub drop_event: Option<DropEvent>,
}

/// Mean and max wind over the lookahead window.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct WindOutlook {
    pub samples: usize,
    pub mean_speed: f64,
    pub max_speed: f64,
    pub mean_southerly: f64,
    pub southerly_risk: bool,
    pub upwelling_warning: bool,
}

pub fn southerly_component(sample: &WindSample, band: &DirectionBand) -> f64 {
    if sample.is_southerly(band) {
        sample.speed
    } else {
        0.0
    }
}

pub fn southerly_series(samples: &[WindSample], band: &DirectionBand) -> Vec<SoutherlyPoint> {
    samples
        .iter()
        .map(|s| SoutherlyPoint {
            timestamp: s.timestamp,
            speed: s.speed,
            direction: s.direction,
            southerly: southerly_component(s, band),
        })
        .collect()
}

/// Rectangle-rule integral of the southerly component, `Σ speed_i · Δt_i`.
///
/// Each sample is weighted by its own step ([`Resolution::per_sample`]), so
/// a forecast that turns 6-hourly halfway through still integrates
/// correctly. Calm samples (speed 0) carry no direction and do not count
/// towards `hours_southerly`.
pub fn cumulative_energy(samples: &[WindSample], band: &DirectionBand) -> CumulativeWindEnergy {
    // ---
    let timestamps: Vec<_> = samples.iter().map(|s| s.timestamp).collect();
    let steps = Resolution::per_sample(&timestamps);
    energy_over(samples.iter().zip(steps), band)
}

/// Same integral over samples already paired with their step.
pub(crate) fn energy_over<'a>(
    weighted: impl IntoIterator<Item = (&'a WindSample, Resolution)>,
    band: &DirectionBand,
) -> CumulativeWindEnergy {
    // ---
    let mut energy = CumulativeWindEnergy {
        energy_mh: 0.0,
        hours_southerly: 0.0,
        resolution_hours: 1.0,
    };
    for (sample, step) in weighted {
        let dt = step.hours();
        energy.resolution_hours = energy.resolution_hours.max(dt);
        if sample.speed > 0.0 && sample.is_southerly(band) {
            energy.energy_mh += sample.speed * dt;
            energy.hours_southerly += dt;
        }
    }
    energy
}

/// Largest fall (earlier max to later min) in the trailing `window_hours`
/// of the series, anchored at its newest observation.
///
/// Returns `None` when fewer than two observations fall in the window or
/// the fall is below `threshold_c`.
pub fn detect_drop(series: &TimeSeries, threshold_c: f64, window_hours: i64) -> Option<DropEvent> {
    // ---
    let anchor = series.latest()?.timestamp;
    let window = TimeWindow::trailing_hours(anchor, window_hours);
    let recent: Vec<_> = series.within(&window).collect();
    if recent.len() < 2 {
        debug!("detect_drop: {} observations in window, need 2", recent.len());
        return None;
    }

    let mut peak = recent[0];
    let mut best: Option<(f64, DateTime<Utc>, f64, DateTime<Utc>)> = None;
    for &obs in &recent {
        if obs.value > peak.value {
            peak = obs;
        }
        let fall = peak.value - obs.value;
        if fall > best.map_or(0.0, |b| b.0 - b.2) {
            best = Some((peak.value, peak.timestamp, obs.value, obs.timestamp));
        }
    }

    let (max_temp, max_time, min_temp, min_time) = best?;
    let magnitude = max_temp - min_temp;
    if magnitude < threshold_c {
        return None;
    }
    Some(DropEvent {
        magnitude,
        max_temp,
        min_temp,
        max_time,
        min_time,
        duration_hours: (min_time - max_time).num_seconds() as f64 / 3600.0,
    })
}

/// Derive all signals for one temperature series and one wind series.
pub fn derive_signals(
    temperature: &TimeSeries,
    wind: &[WindSample],
    profile: &ModelProfile,
) -> DerivedSignals {
    // ---
    DerivedSignals {
        southerly_series: southerly_series(wind, &profile.southerly_band),
        cumulative_energy: cumulative_energy(wind, &profile.southerly_band),
        drop_event: detect_drop(
            temperature,
            profile.drop_threshold_c,
            profile.drop_window_hours,
        ),
    }
}

/// Wind statistics for the lookahead window, or `None` without samples.
///
/// The window starts at the top of the hour `now` falls in, which is where
/// Met.no puts its first step.
pub fn wind_outlook(
    wind: &[WindSample],
    now: DateTime<Utc>,
    profile: &ModelProfile,
) -> Option<WindOutlook> {
    // ---
    let start = now.duration_trunc(Duration::hours(1)).unwrap_or(now);
    let end = start + Duration::hours(profile.southerly_lookahead_hours);
    let ahead: Vec<_> = wind
        .iter()
        .filter(|s| s.timestamp >= start && s.timestamp < end)
        .collect();
    if ahead.is_empty() {
        return None;
    }

    let n = ahead.len() as f64;
    let mean_speed = ahead.iter().map(|s| s.speed).sum::<f64>() / n;
    let max_speed = ahead.iter().map(|s| s.speed).fold(0.0, f64::max);
    let mean_southerly = ahead
        .iter()
        .map(|s| southerly_component(s, &profile.southerly_band))
        .sum::<f64>()
        / n;

    Some(WindOutlook {
        samples: ahead.len(),
        mean_speed,
        max_speed,
        mean_southerly,
        southerly_risk: mean_southerly >= profile.southerly_risk_speed,
        upwelling_warning: mean_southerly >= profile.critical_wind_speed,
    })
}
