//! Met.no locationforecast client (wind only).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{FetchError, FetchOutcome, Location, WindForecastSource};
use crate::models::{parse_timestamp, RawWindSample};

// ---

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Properties {
    #[serde(default)]
    timeseries: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Step {
    time: String,
    data: StepData,
}

#[derive(Debug, Deserialize)]
struct StepData {
    instant: Instant,
}

#[derive(Debug, Deserialize)]
struct Instant {
    details: Details,
}

#[derive(Debug, Deserialize)]
struct Details {
    wind_speed: Option<f64>,
    wind_from_direction: Option<f64>,
}

/// Decode a `compact` body, keeping steps up to and including `until`.
pub(crate) fn parse_forecast(
    body: &str,
    until: DateTime<Utc>,
) -> Result<Vec<RawWindSample>, FetchError> {
    // ---
    let response: ForecastResponse = serde_json::from_str(body).map_err(|e| FetchError::Decode {
        provider: "Met.no",
        reason: e.to_string(),
    })?;

    let mut samples = Vec::new();
    for step in response.properties.timeseries {
        // Steps are chronological; stop at the first one past the horizon.
        if parse_timestamp(&step.time).is_some_and(|t| t > until) {
            break;
        }
        let details = step.data.instant.details;
        samples.push(RawWindSample {
            time: Some(step.time),
            wind_speed: details.wind_speed,
            wind_direction: details.wind_from_direction,
        });
    }
    Ok(samples)
}

pub struct MetNoClient {
    http: Client,
    base_url: String,
}

impl MetNoClient {
    /// `http` must carry an identifying User-Agent; Met.no answers 403 otherwise.
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(
        &self,
        location: &Location,
        days_ahead: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<RawWindSample>, FetchError> {
        // ---
        let url = format!("{}/compact", self.base_url);
        debug!("Fetching wind forecast for {} from {}", location.id(), url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", format!("{:.4}", location.lat)),
                ("lon", format!("{:.4}", location.lon)),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                provider: "Met.no",
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_forecast(&body, now + Duration::days(days_ahead))
    }
}

#[async_trait]
impl WindForecastSource for MetNoClient {
    async fn fetch_wind_forecast(
        &self,
        location: &Location,
        days_ahead: i64,
        now: DateTime<Utc>,
    ) -> FetchOutcome<RawWindSample> {
        let result = self.fetch(location, days_ahead, now).await;
        if let Err(e) = &result {
            warn!("Could not fetch wind forecast for {}: {}", location.id(), e);
        }
        result.into()
    }
}
