//! Event calendar, station season and data freshness.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc, Weekday};
use serde::Serialize;

use crate::models::TimeSeries;

// ---

const EVENT_MONTH: u32 = 8;
const EVENT_START_HOUR: u32 = 10;
/// Europe/Oslo observes CEST (UTC+2) throughout August.
const OSLO_SUMMER_OFFSET_SECS: i32 = 2 * 3600;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct EventInfo {
    pub start: DateTime<Utc>,
    pub days_until: i64,
}

/// First Saturday of August, 10:00 local time, in UTC.
pub fn event_start(year: i32) -> Option<DateTime<Utc>> {
    // ---
    let first = NaiveDate::from_ymd_opt(year, EVENT_MONTH, 1)?;
    let offset =
        (7 + Weekday::Sat.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
    let saturday = first + Duration::days(i64::from(offset));
    let local = saturday.and_hms_opt(EVENT_START_HOUR, 0, 0)?;
    FixedOffset::east_opt(OSLO_SUMMER_OFFSET_SECS)?
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// The event to predict for: `pinned_year` if given, otherwise this year's
/// event unless it has already started, in which case next year's.
pub fn next_event(now: DateTime<Utc>, pinned_year: Option<i32>) -> Option<EventInfo> {
    // ---
    let start = match pinned_year {
        Some(year) => event_start(year)?,
        None => {
            let this_year = event_start(now.year())?;
            if this_year >= now {
                this_year
            } else {
                event_start(now.year() + 1)?
            }
        }
    };
    Some(EventInfo {
        start,
        days_until: (start - now).num_days(),
    })
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StationSeason {
    /// April through September.
    Active,
    /// Shut down over winter to avoid ice damage.
    WinterShutdown,
}

pub fn station_season(now: DateTime<Utc>) -> StationSeason {
    if (4..=9).contains(&now.month()) {
        StationSeason::Active
    } else {
        StationSeason::WinterShutdown
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessLevel {
    Fresh,
    Aging,
    Stale,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DataFreshness {
    pub latest: DateTime<Utc>,
    pub age_hours: f64,
    pub level: FreshnessLevel,
    /// Older than a week; the station is probably offline.
    pub outdated: bool,
}

/// Age of the newest observation relative to `now`.
pub fn data_freshness(series: &TimeSeries, now: DateTime<Utc>) -> Option<DataFreshness> {
    // ---
    let latest = series.latest()?.timestamp;
    let age_hours = (now - latest).num_seconds() as f64 / 3600.0;
    let level = if age_hours < 2.0 {
        FreshnessLevel::Fresh
    } else if age_hours < 6.0 {
        FreshnessLevel::Aging
    } else {
        FreshnessLevel::Stale
    };
    Some(DataFreshness {
        latest,
        age_hours,
        level,
        outdated: age_hours > 7.0 * 24.0,
    })
}

/// Whether a prediction is worth showing: data older than 30 days cannot
/// say anything about an event more than 30 days out.
pub fn prediction_is_stale(freshness: &DataFreshness, event: &EventInfo) -> bool {
    freshness.age_hours / 24.0 > 30.0 && event.days_until > 30
}

/// Latest value minus the value 24 samples earlier.
pub fn change_24h(series: &TimeSeries) -> Option<f64> {
    let obs = series.observations();
    if obs.len() < 24 {
        return None;
    }
    Some(obs[obs.len() - 1].value - obs[obs.len() - 24].value)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{RawObservation, TimeWindow};
    use crate::pipeline::normalize;

    #[test]
    fn test_event_is_first_saturday_of_august() {
        // ---
        // 1 Aug 2026 is a Saturday, 1 Aug 2025 a Friday.
        assert_eq!(
            event_start(2026).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 1, 8, 0, 0).unwrap()
        );
        assert_eq!(
            event_start(2025).unwrap(),
            Utc.with_ymd_and_hms(2025, 8, 2, 8, 0, 0).unwrap()
        );
        assert_eq!(
            event_start(2027).unwrap(),
            Utc.with_ymd_and_hms(2027, 8, 7, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_event_rolls_over_after_start() {
        // ---
        let before = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let info = next_event(before, None).unwrap();
        assert_eq!(info.start.year(), 2026);
        assert_eq!(info.days_until, 31);

        let after = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();
        assert_eq!(next_event(after, None).unwrap().start.year(), 2027);

        let pinned = next_event(after, Some(2026)).unwrap();
        assert_eq!(pinned.start.year(), 2026);
        assert!(pinned.days_until <= 0);
    }

    #[test]
    fn test_station_season() {
        // ---
        let at = |m| Utc.with_ymd_and_hms(2026, m, 15, 0, 0, 0).unwrap();
        assert_eq!(station_season(at(3)), StationSeason::WinterShutdown);
        assert_eq!(station_season(at(4)), StationSeason::Active);
        assert_eq!(station_season(at(9)), StationSeason::Active);
        assert_eq!(station_season(at(10)), StationSeason::WinterShutdown);
    }

    fn hourly_series(end: DateTime<Utc>, values: &[f64]) -> TimeSeries {
        let n = values.len() as i64;
        let raw: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, v)| RawObservation {
                time: Some((end - Duration::hours(n - 1 - i as i64)).to_rfc3339()),
                value: Some(*v),
                quality: None,
            })
            .collect();
        normalize(&raw, &TimeWindow::trailing_hours(end, 1000), None)
    }

    #[test]
    fn test_freshness_levels() {
        // ---
        let latest = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        let series = hourly_series(latest, &[18.0, 18.2]);

        let at = |h| data_freshness(&series, latest + Duration::hours(h)).unwrap();
        assert_eq!(at(1).level, FreshnessLevel::Fresh);
        assert_eq!(at(3).level, FreshnessLevel::Aging);
        assert_eq!(at(7).level, FreshnessLevel::Stale);
        assert!(!at(7).outdated);
        assert!(at(24 * 8).outdated);

        assert!(data_freshness(&TimeSeries::empty(), latest).is_none());
    }

    #[test]
    fn test_stale_prediction_gate() {
        // ---
        let latest = Utc.with_ymd_and_hms(2025, 9, 30, 12, 0, 0).unwrap();
        let series = hourly_series(latest, &[12.0]);
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
        let freshness = data_freshness(&series, now).unwrap();
        let event = next_event(now, None).unwrap();
        assert!(prediction_is_stale(&freshness, &event));

        let summer = Utc.with_ymd_and_hms(2026, 7, 25, 0, 0, 0).unwrap();
        let near = next_event(summer, None).unwrap();
        assert!(!prediction_is_stale(&freshness, &near));
    }

    #[test]
    fn test_change_24h_needs_24_samples() {
        // ---
        let end = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        let mut values = vec![18.0; 23];
        assert!(change_24h(&hourly_series(end, &values)).is_none());

        values.push(16.5);
        assert_eq!(change_24h(&hourly_series(end, &values)), Some(-1.5));
    }
}
