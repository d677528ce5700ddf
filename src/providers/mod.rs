//! Data provider collaborators.
//!
//! The pipeline only ever sees [`FetchOutcome`]s: a list of raw records plus
//! an optional diagnostic. Transport, authentication and response formats
//! stay behind the [`ObservationSource`] and [`WindForecastSource`] traits.
//! A failed fetch is an empty list with `error` set, never an `Err`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use crate::models::{RawObservation, RawWindSample, Resolution, TimeWindow};

mod cache;
mod met;
mod nve;

pub use cache::{CachedObservationSource, CachedWindSource, FetchKey, TtlCache};
pub use met::MetNoClient;
pub use nve::NveClient;

// ---

/// Failure inside a provider adapter. Converted to a diagnostic string
/// before it leaves the adapter.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{provider} API error: HTTP {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("could not decode {provider} response: {reason}")]
    Decode {
        provider: &'static str,
        reason: String,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// Records from one fetch plus an optional human-readable diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<T> {
    pub items: Vec<T>,
    pub error: Option<String>,
}

impl<T> FetchOutcome<T> {
    pub fn ok(items: Vec<T>) -> Self {
        Self { items, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl<T> From<Result<Vec<T>, FetchError>> for FetchOutcome<T> {
    fn from(result: Result<Vec<T>, FetchError>) -> Self {
        match result {
            Ok(items) => Self::ok(items),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// One station/parameter time-series request.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub source_id: String,
    pub parameter: u32,
    pub resolution: Resolution,
    pub window: TimeWindow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    /// Stable identifier used in cache keys, rounded to Met.no's 4 decimals.
    pub fn id(&self) -> String {
        format!("{:.4},{:.4}", self.lat, self.lon)
    }
}

#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn fetch_timeseries(&self, request: &SeriesRequest) -> FetchOutcome<RawObservation>;
}

#[async_trait]
pub trait WindForecastSource: Send + Sync {
    /// Forecast samples from `now` up to `now + days_ahead`.
    async fn fetch_wind_forecast(
        &self,
        location: &Location,
        days_ahead: i64,
        now: DateTime<Utc>,
    ) -> FetchOutcome<RawWindSample>;
}

/// Run several series fetches with at most `limit` in flight.
///
/// Outcomes come back in request order whatever order the fetches finish
/// in. One failing request never affects the others.
pub async fn fetch_observations_concurrently(
    source: Arc<dyn ObservationSource>,
    requests: Vec<SeriesRequest>,
    limit: usize,
) -> Vec<FetchOutcome<RawObservation>> {
    // ---
    let permits = Arc::new(Semaphore::new(limit.clamp(1, 8)));
    let mut set = JoinSet::new();

    for (idx, request) in requests.iter().cloned().enumerate() {
        let source = Arc::clone(&source);
        let permits = Arc::clone(&permits);
        set.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(_permit) => source.fetch_timeseries(&request).await,
                Err(e) => FetchOutcome::failed(format!("fetch limiter closed: {e}")),
            };
            (idx, outcome)
        });
    }

    let mut slots: Vec<Option<FetchOutcome<RawObservation>>> = vec![None; requests.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, outcome)) => slots[idx] = Some(outcome),
            Err(e) => warn!("fetch task did not complete: {}", e),
        }
    }

    slots
        .into_iter()
        .zip(requests.iter())
        .map(|(slot, request)| {
            slot.unwrap_or_else(|| {
                FetchOutcome::failed(format!(
                    "fetch for station {} did not complete",
                    request.source_id
                ))
            })
        })
        .collect()
}
