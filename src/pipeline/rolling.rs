//! Rolling forecaster: one energy-scheme risk entry per future day.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::debug;

use crate::config::ModelProfile;
use crate::models::{DailyRiskEntry, Resolution, WindSample};
use crate::pipeline::risk::{classify_risk, ClassifierMode, RiskInput};
use crate::pipeline::signals::energy_over;

// ---

pub const DEFAULT_HORIZON_DAYS: u32 = 21;
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Hour of day every target is pinned to.
const TARGET_HOUR: u32 = 12;

/// Classify each of the next `horizon_days` days from the trailing
/// `window_days` of `wind`.
///
/// Day `n` targets noon UTC on `today + n`, where today is taken from `now`.
/// The window is `(target - window_days, target]`. Days whose window holds
/// no samples are left out. The result depends only on the arguments.
///
/// Steps are taken from the whole series before windowing, so a sample at
/// a window edge keeps its real spacing.
pub fn rolling_forecast(
    wind: &[WindSample],
    now: DateTime<Utc>,
    horizon_days: u32,
    window_days: u32,
    profile: &ModelProfile,
) -> Vec<DailyRiskEntry> {
    // ---
    let timestamps: Vec<_> = wind.iter().map(|s| s.timestamp).collect();
    let steps = Resolution::per_sample(&timestamps);
    let noon = NaiveTime::from_hms_opt(TARGET_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive();

    let mut entries = Vec::with_capacity(horizon_days as usize);
    for day_offset in 0..horizon_days {
        let date = today + Duration::days(i64::from(day_offset));
        let target = date.and_time(noon).and_utc();
        let start = target - Duration::days(i64::from(window_days));

        let window: Vec<(&WindSample, Resolution)> = wind
            .iter()
            .zip(steps.iter().copied())
            .filter(|(s, _)| s.timestamp > start && s.timestamp <= target)
            .collect();
        if window.is_empty() {
            debug!("rolling_forecast: no samples for {}, skipping", date);
            continue;
        }

        let energy = energy_over(window.iter().copied(), &profile.southerly_band);
        let assessment = classify_risk(
            &RiskInput::from_energy(&energy),
            ClassifierMode::Energy,
            profile,
        );
        entries.push(DailyRiskEntry {
            date,
            target_time: target,
            samples: window.len(),
            energy,
            assessment,
        });
    }
    entries
}
