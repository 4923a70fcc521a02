//! HTTP clients for the live upstream APIs.
//!
//! Three public, unauthenticated JSON endpoints: wheretheiss.at for the
//! station position, open-notify for the crew roster, and the SpaceX v4 API
//! for the next launch. Responses deserialize into small typed structs;
//! anything that does not parse surfaces as a [`FetchError`] and becomes a
//! fallback upstream of here.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::errors::{FetchError, FetchResult};

/// Shared HTTP client with a bounded timeout and a fixed user agent.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("orbitdeck/0.1")
            .build()?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

/// Position payload returned by wheretheiss.at.
#[derive(Debug, Clone, Deserialize)]
pub struct StationPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Kilometres above the surface.
    pub altitude: f64,
    /// Kilometres per hour.
    pub velocity: f64,
}

/// Station tracking client (wheretheiss.at).
pub struct IssClient {
    http: HttpClient,
    base_url: String,
}

impl IssClient {
    pub fn new(base_url: String, timeout: Duration) -> FetchResult<Self> {
        Ok(Self {
            http: HttpClient::new(timeout)?,
            base_url,
        })
    }

    /// Fetch the current station position.
    pub async fn fetch_position(&self) -> FetchResult<StationPosition> {
        let resp = self
            .http
            .get_client()
            .get(&self.base_url)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        resp.json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

/// One person in the open-notify roster.
#[derive(Debug, Clone, Deserialize)]
pub struct AstroPerson {
    pub name: String,
    pub craft: String,
}

/// Roster payload returned by open-notify.
#[derive(Debug, Clone, Deserialize)]
pub struct AstrosResponse {
    pub number: u32,
    #[serde(default)]
    pub people: Vec<AstroPerson>,
}

/// Crew roster client (open-notify).
pub struct CrewClient {
    http: HttpClient,
    base_url: String,
}

impl CrewClient {
    pub fn new(base_url: String, timeout: Duration) -> FetchResult<Self> {
        Ok(Self {
            http: HttpClient::new(timeout)?,
            base_url,
        })
    }

    /// Fetch everyone currently in space, by craft.
    pub async fn fetch_roster(&self) -> FetchResult<AstrosResponse> {
        let resp = self
            .http
            .get_client()
            .get(&self.base_url)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        resp.json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

/// Launch payload returned by the SpaceX v4 API.
#[derive(Debug, Clone, Deserialize)]
pub struct NextLaunch {
    pub name: String,
    pub date_utc: DateTime<Utc>,
    /// Rocket id; the v4 API uses opaque identifiers here.
    #[serde(default)]
    pub rocket: Option<String>,
}

/// SpaceX launch schedule client.
pub struct LaunchClient {
    http: HttpClient,
    base_url: String,
}

impl LaunchClient {
    pub fn new(base_url: String, timeout: Duration) -> FetchResult<Self> {
        Ok(Self {
            http: HttpClient::new(timeout)?,
            base_url,
        })
    }

    /// Fetch the next scheduled launch.
    pub async fn fetch_next(&self) -> FetchResult<NextLaunch> {
        let resp = self
            .http
            .get_client()
            .get(&self.base_url)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        resp.json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}
