//! Propagation predictor.
//!
//! The upstream reading taken one travel time before the target instant is
//! compared against its trailing baseline. Only `survival_rate` of that
//! anomaly reaches the venue; the rest is diluted at the confluence.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::ModelProfile;
use crate::models::{Prediction, TimeSeries, TimeWindow};

// ---

/// Two-sided 95% interval around a prediction.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PredictionInterval {
    pub lower: f64,
    pub upper: f64,
}

fn hours(h: f64) -> Duration {
    Duration::seconds((h * 3600.0).round() as i64)
}

/// Predict the downstream temperature at `target`.
///
/// Returns `None` only when `upstream` is empty. A target far outside the
/// data still yields a prediction from the closest observation; the
/// confidence score tells the caller how much to trust it.
pub fn predict(
    upstream: &TimeSeries,
    target: DateTime<Utc>,
    now: DateTime<Utc>,
    profile: &ModelProfile,
) -> Option<Prediction> {
    // ---
    let prediction_time = target - hours(profile.travel_time_hours);

    let selected = *upstream
        .observations()
        .iter()
        .min_by_key(|o| (o.timestamp - prediction_time).num_seconds().abs())?;

    let baseline_window =
        TimeWindow::trailing_hours(selected.timestamp, profile.baseline_hours);
    let (sum, count) = upstream
        .within(&baseline_window)
        .fold((0.0, 0usize), |(s, n), o| (s + o.value, n + 1));
    // The selected observation is always inside its own window.
    let baseline = sum / count.max(1) as f64;

    let anomaly = selected.value - baseline;
    let predicted_temp = baseline + anomaly * profile.survival_rate;
    let confidence = confidence(upstream, selected.timestamp, now, profile);

    debug!(
        "predict: target {} uses upstream {} ({:.2}°C), baseline {:.2}°C over {} points",
        target, selected.timestamp, selected.value, baseline, count
    );

    Some(Prediction {
        target_time: target,
        predicted_temp,
        source_temp: selected.value,
        source_time: selected.timestamp,
        baseline_temp: baseline,
        anomaly,
        confidence,
    })
}

/// Staleness of the selected observation against `now`, times completeness.
pub fn confidence(
    upstream: &TimeSeries,
    selected_at: DateTime<Utc>,
    now: DateTime<Utc>,
    profile: &ModelProfile,
) -> f64 {
    // ---
    let hours_old = ((now - selected_at).num_seconds() as f64 / 3600.0).max(0.0);
    let time_confidence = if hours_old < 1.0 {
        1.0
    } else if hours_old < 6.0 {
        0.9
    } else if hours_old < 24.0 {
        0.7
    } else {
        0.5
    };

    let completeness = (upstream.len() as f64 / profile.expected_points as f64).min(1.0);
    time_confidence * completeness
}

/// `predicted ± 1.96 σ` using the validated model standard error.
pub fn prediction_interval(prediction: &Prediction, profile: &ModelProfile) -> PredictionInterval {
    let margin = 1.96 * profile.model_std_error_c;
    PredictionInterval {
        lower: prediction.predicted_temp - margin,
        upper: prediction.predicted_temp + margin,
    }
}
