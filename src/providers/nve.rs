//! NVE HydAPI observation client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{FetchError, FetchOutcome, ObservationSource, SeriesRequest};
use crate::models::RawObservation;

// ---

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    data: Vec<StationSeries>,
}

#[derive(Debug, Deserialize)]
struct StationSeries {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

/// Decode an `/Observations` body into raw records of the first series.
pub(crate) fn parse_observations(body: &str) -> Result<Vec<RawObservation>, FetchError> {
    // ---
    let response: ObservationsResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode {
            provider: "NVE",
            reason: e.to_string(),
        })?;
    Ok(response
        .data
        .into_iter()
        .next()
        .map(|series| series.observations)
        .unwrap_or_default())
}

pub struct NveClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl NveClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn fetch(&self, request: &SeriesRequest) -> Result<Vec<RawObservation>, FetchError> {
        // ---
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FetchError::NotConfigured("NVE_API_KEY"))?;

        // No ReferenceTime: HydAPI then returns the most recent data, and the
        // normalizer trims it to the requested window.
        let url = format!("{}/Observations", self.base_url);
        debug!(
            "Fetching station {} parameter {} from {}",
            request.source_id, request.parameter, url
        );

        let response = self
            .http
            .get(&url)
            .header("X-API-Key", api_key)
            .header("accept", "application/json")
            .query(&[
                ("StationId", request.source_id.clone()),
                ("Parameter", request.parameter.to_string()),
                ("ResolutionTime", request.resolution.minutes().to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            // The station reports 400 while it is shut down for winter.
            debug!("station {} has no current data (HTTP 400)", request.source_id);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                provider: "NVE",
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_observations(&body)
    }
}

#[async_trait]
impl ObservationSource for NveClient {
    async fn fetch_timeseries(&self, request: &SeriesRequest) -> FetchOutcome<RawObservation> {
        let result = self.fetch(request).await;
        if let Err(e) = &result {
            warn!("Could not fetch station {}: {}", request.source_id, e);
        }
        result.into()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_parse_first_series() {
        // ---
        let body = r#"{
            "currentLink": "x",
            "data": [{
                "stationId": "2.410.0",
                "parameter": 1003,
                "observations": [
                    {"time": "2026-07-01T10:00:00Z", "value": 17.8, "quality": 2},
                    {"time": "2026-07-01T11:00:00Z", "value": null, "quality": 0},
                    {"time": "2026-07-01T12:00:00Z", "value": 17.6, "correction": 0, "quality": 1}
                ]
            }]
        }"#;
        let records = parse_observations(body).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].value, Some(17.8));
        assert_eq!(records[1].value, None);
        assert_eq!(records[2].quality, Some(1));
    }

    #[test]
    fn test_parse_empty_data() {
        // ---
        assert!(parse_observations(r#"{"data": []}"#).unwrap().is_empty());
        assert!(parse_observations(r#"{}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_decode_error() {
        // ---
        assert!(matches!(
            parse_observations("<html>"),
            Err(FetchError::Decode { provider: "NVE", .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_reported_not_raised() {
        // ---
        use crate::models::{Resolution, TimeWindow};
        use chrono::{Duration, TimeZone, Utc};

        let client = NveClient::new(Client::new(), "http://127.0.0.1:9", None);
        let end = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let outcome = client
            .fetch_timeseries(&SeriesRequest {
                source_id: "2.410.0".into(),
                parameter: 1003,
                resolution: Resolution::Hourly,
                window: TimeWindow::new(end - Duration::hours(72), end),
            })
            .await;
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.error.as_deref(), Some("NVE_API_KEY is not configured"));
    }
}
