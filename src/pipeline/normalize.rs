//! Observation normalizer.
//!
//! Turns provider records into ordered UTC series. Malformed records are
//! dropped, never reported as errors; an empty result means "no data".

use tracing::debug;

use crate::models::{
    parse_timestamp, RawObservation, RawWindSample, TimeSeries, TimeWindow, WindSample,
};

// ---

/// Normalize raw observations into an ascending [`TimeSeries`].
///
/// Records outside `window` are dropped, as are records whose quality code
/// is present but not in `quality_filter`. Records without a quality code
/// are kept.
pub fn normalize(
    raw: &[RawObservation],
    window: &TimeWindow,
    quality_filter: Option<&[i32]>,
) -> TimeSeries {
    // ---
    let mut kept: Vec<_> = raw
        .iter()
        .filter_map(RawObservation::to_observation)
        .filter(|o| window.contains(o.timestamp))
        .filter(|o| match (o.quality, quality_filter) {
            (Some(q), Some(accepted)) => accepted.contains(&q),
            _ => true,
        })
        .collect();

    // Stable, so equal timestamps keep provider order.
    kept.sort_by_key(|o| o.timestamp);

    if kept.len() != raw.len() {
        debug!(
            "normalize: kept {} of {} records in [{}, {}]",
            kept.len(),
            raw.len(),
            window.start,
            window.end
        );
    }
    TimeSeries::from_sorted(kept)
}

/// Normalize raw wind records into ascending [`WindSample`]s inside `window`.
///
/// Samples missing speed or direction, or with a negative speed, are dropped.
/// Directions are folded into `[0, 360)`.
pub fn normalize_wind(raw: &[RawWindSample], window: &TimeWindow) -> Vec<WindSample> {
    // ---
    let mut kept: Vec<WindSample> = raw
        .iter()
        .filter_map(|r| {
            let timestamp = parse_timestamp(r.time.as_deref()?)?;
            let speed = r.wind_speed.filter(|s| s.is_finite() && *s >= 0.0)?;
            let direction = r.wind_direction.filter(|d| d.is_finite())?.rem_euclid(360.0);
            Some(WindSample {
                timestamp,
                speed,
                direction,
            })
        })
        .filter(|s| window.contains(s.timestamp))
        .collect();

    kept.sort_by_key(|s| s.timestamp);
    kept
}
