//! Telemetry API client.
//!
//! [`TelemetryApi`] is the seam between surfaces and the network. The HTTP
//! implementation talks to the flight wall backend; tests substitute their
//! own.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use flightwall_core::model::{DetailResponse, HistoryResponse, RotationResponse, SnapshotResponse};
use flightwall_core::surface::{Request, Response};
use flightwall_core::types::{FlightwallError, Icao24, Result};

#[async_trait]
pub trait TelemetryApi: Send + Sync {
    /// `GET /api/flights`
    async fn snapshot(&self) -> Result<SnapshotResponse>;

    /// `GET /api/flights/{icao24}?include_analytics=true`
    async fn detail(&self, icao24: Icao24) -> Result<DetailResponse>;

    /// `GET /api/flights/history/{icao24}?minutes=N`
    async fn history(&self, icao24: Icao24, minutes: u32) -> Result<HistoryResponse>;

    /// `GET /api/flights/ticker`
    async fn rotation(&self, max_distance_km: f64, rotation_secs: u64) -> Result<RotationResponse>;
}

/// Run one surface request against `api`.
pub async fn execute(api: &dyn TelemetryApi, request: &Request) -> Result<Response> {
    Ok(match request {
        Request::Snapshot => Response::Snapshot(api.snapshot().await?),
        Request::Detail(id) => Response::Detail(Box::new(api.detail(*id).await?)),
        Request::History { tag, minutes } => Response::History {
            tag: *tag,
            response: api.history(tag.icao24, *minutes).await?,
        },
        Request::Rotation {
            max_distance_km,
            rotation_secs,
        } => Response::Rotation(api.rotation(*max_distance_km, *rotation_secs).await?),
    })
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FlightwallError::Transport(e.to_string()))?;
        Ok(HttpApi {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FlightwallError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FlightwallError::Status(status.as_u16()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| FlightwallError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TelemetryApi for HttpApi {
    async fn snapshot(&self) -> Result<SnapshotResponse> {
        self.get_json("/api/flights", &[]).await
    }

    async fn detail(&self, icao24: Icao24) -> Result<DetailResponse> {
        self.get_json(
            &format!("/api/flights/{icao24}"),
            &[("include_analytics", "true".to_string())],
        )
        .await
    }

    async fn history(&self, icao24: Icao24, minutes: u32) -> Result<HistoryResponse> {
        self.get_json(
            &format!("/api/flights/history/{icao24}"),
            &[("minutes", minutes.to_string())],
        )
        .await
    }

    async fn rotation(&self, max_distance_km: f64, rotation_secs: u64) -> Result<RotationResponse> {
        self.get_json(
            "/api/flights/ticker",
            &[
                ("max_distance", max_distance_km.to_string()),
                ("rotation_interval", rotation_secs.to_string()),
            ],
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
