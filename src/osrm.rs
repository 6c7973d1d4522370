//! OSRM v1 wire types and the HTTP transports that fetch them.
//!
//! Two deployments are supported: talking to `osrm-routed` directly, and
//! going through the yard gateway which proxies the same payload behind a
//! bearer token.

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::instructions::Maneuver;
use crate::waypoint::Coordinate;

pub const DEFAULT_PROFILE: &str = "driving";
pub const GATEWAY_ROUTE_PATH: &str = "/routing/calculate-route";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsrmResponse {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
    #[serde(default)]
    pub waypoints: Vec<OsrmWaypoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsrmRoute {
    pub distance: f64,
    pub duration: f64,
    /// Overview geometry; absent when requested with `overview=false`.
    #[serde(default)]
    pub geometry: Option<String>,
    #[serde(default)]
    pub legs: Vec<OsrmLeg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsrmLeg {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub steps: Vec<OsrmStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsrmStep {
    #[serde(default)]
    pub geometry: String,
    pub maneuver: Maneuver,
    pub distance: f64,
    pub duration: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsrmWaypoint {
    /// `[lng, lat]`
    pub location: [f64; 2],
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub name: String,
}

impl OsrmWaypoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.location[1], self.location[0])
    }
}

/// Geometry overview requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overview {
    /// Step geometries only.
    False,
    /// Full-resolution overview, used for detailed geometry-only requests.
    Full,
    /// Backend default (simplified); the parameter is left out.
    Simplified,
}

impl Overview {
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            Overview::False => Some("false"),
            Overview::Full => Some("full"),
            Overview::Simplified => None,
        }
    }
}

/// One request as sent to the backend. Built fresh per computation.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub coordinates: Vec<Coordinate>,
    pub profile: String,
    pub overview: Overview,
    pub alternatives: bool,
    pub steps: bool,
    /// One hint per coordinate, `None` when hints are disabled.
    pub hints: Option<Vec<String>>,
    pub continue_straight: Option<bool>,
    pub precision: u32,
}

impl RouteRequest {
    pub fn new(coordinates: Vec<Coordinate>, profile: impl Into<String>) -> Self {
        Self {
            coordinates,
            profile: profile.into(),
            overview: Overview::False,
            alternatives: true,
            steps: true,
            hints: None,
            continue_straight: None,
            precision: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("routing service answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed routing response: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Fetches raw route responses from some backend.
pub trait RouteTransport: Send + Sync {
    fn fetch<'a>(&'a self, request: &'a RouteRequest) -> BoxFuture<'a, Result<OsrmResponse, TransportError>>;
}

/// OSRM answers a failed route with a JSON body and a 4xx status, so the
/// body is parsed first and the status only matters when it isn't a route
/// response.
async fn read_response(response: reqwest::Response) -> Result<OsrmResponse, TransportError> {
    let status = response.status();
    let body = response.text().await?;
    debug!(status = status.as_u16(), bytes = body.len(), "routing response received");

    match serde_json::from_str::<OsrmResponse>(&body) {
        Ok(parsed) => Ok(parsed),
        Err(_) if !status.is_success() => Err(TransportError::Status {
            status: status.as_u16(),
            body,
        }),
        Err(err) => Err(err.into()),
    }
}

/// Direct `GET /route/v1/{profile}/{coordinates}` against `osrm-routed`.
#[derive(Debug, Clone)]
pub struct OsrmHttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl OsrmHttpTransport {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn route_url(&self, request: &RouteRequest) -> String {
        let locations = request
            .coordinates
            .iter()
            .map(|c| format!("{},{}", c.lng, c.lat))
            .collect::<Vec<_>>()
            .join(";");

        let mut params = Vec::new();
        if let Some(overview) = request.overview.as_param() {
            params.push(format!("overview={overview}"));
        }
        params.push(format!("alternatives={}", request.alternatives));
        params.push(format!("steps={}", request.steps));
        if request.precision == 6 {
            params.push("geometries=polyline6".to_string());
        }
        if let Some(hints) = &request.hints {
            params.push(format!("hints={}", hints.join(";")));
        }
        if let Some(continue_straight) = request.continue_straight {
            params.push(format!("continue_straight={continue_straight}"));
        }

        format!(
            "{}/route/v1/{}/{}?{}",
            self.base_url.trim_end_matches('/'),
            request.profile,
            locations,
            params.join("&")
        )
    }
}

impl RouteTransport for OsrmHttpTransport {
    fn fetch<'a>(&'a self, request: &'a RouteRequest) -> BoxFuture<'a, Result<OsrmResponse, TransportError>> {
        async move {
            let url = self.route_url(request);
            debug!(%url, "requesting route");
            let response = self.client.get(url).send().await?;
            read_response(response).await
        }
        .boxed()
    }
}

#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    waypoints: &'a [Coordinate],
    profile: &'a str,
}

/// `POST {base}/routing/calculate-route` through the yard gateway.
///
/// The gateway builds the OSRM query itself and returns its body
/// unchanged; hints and flags are not forwarded.
#[derive(Debug, Clone)]
pub struct GatewayTransport {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl GatewayTransport {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            token: None,
            client,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn route_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), GATEWAY_ROUTE_PATH)
    }
}

impl RouteTransport for GatewayTransport {
    fn fetch<'a>(&'a self, request: &'a RouteRequest) -> BoxFuture<'a, Result<OsrmResponse, TransportError>> {
        async move {
            let url = self.route_url();
            debug!(%url, waypoints = request.coordinates.len(), "requesting route via gateway");
            let mut builder = self.client.post(url).json(&GatewayRequest {
                waypoints: &request.coordinates,
                profile: &request.profile,
            });
            if let Some(token) = &self.token {
                builder = builder.bearer_auth(token);
            }
            let response = builder.send().await?;
            read_response(response).await
        }
        .boxed()
    }
}
