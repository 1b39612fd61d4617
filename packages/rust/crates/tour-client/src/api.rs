//! Backend client: points-of-interest query and tour builder.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tour_scorer::CategoryWeightMap;

/// Backend used when neither settings nor `TOUR_API_URL` name one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
/// Router the tour builder uses unless told otherwise.
pub const DEFAULT_ROUTER: &str = "osrm";
/// OSRM endpoint as seen from the backend.
pub const DEFAULT_ROUTER_URL: &str = "http://osrm:5000";
/// Search radius in meters.
pub const DEFAULT_RADIUS_M: u32 = 700;

/// Errors from backend calls.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure (connect, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Response body was not the expected JSON.
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Request body for `POST /api/pois`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoiQuery {
    /// Center latitude.
    pub lat: f64,
    /// Center longitude.
    pub lon: f64,
    /// Search radius in meters.
    pub radius_m: u32,
    /// Category weights used for scoring.
    pub cat_weights: CategoryWeightMap,
}

/// Request body for `POST /api/tour`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourRequest {
    /// Start latitude.
    pub lat: f64,
    /// Start longitude.
    pub lon: f64,
    /// Time budget in minutes.
    pub time_min: u32,
    /// Candidate search radius in meters.
    pub radius_m: u32,
    /// Whether the tour ends where it starts.
    pub roundtrip: bool,
    /// End latitude; always `None` on round trips.
    pub end_lat: Option<f64>,
    /// End longitude; always `None` on round trips.
    pub end_lon: Option<f64>,
    /// Routing engine name.
    pub router: String,
    /// Routing engine base url.
    pub router_url: String,
    /// Snap the returned path to streets.
    pub snap_path: bool,
    /// Category weights used for scoring.
    pub cat_weights: CategoryWeightMap,
}

impl TourRequest {
    /// Tour that returns to its start.
    #[must_use]
    pub fn round_trip(
        lat: f64,
        lon: f64,
        time_min: u32,
        radius_m: u32,
        cat_weights: CategoryWeightMap,
    ) -> Self {
        Self {
            lat,
            lon,
            time_min,
            radius_m,
            roundtrip: true,
            end_lat: None,
            end_lon: None,
            router: DEFAULT_ROUTER.to_string(),
            router_url: DEFAULT_ROUTER_URL.to_string(),
            snap_path: true,
            cat_weights,
        }
    }

    /// Tour ending at `end`; a missing end leaves the backend to choose.
    #[must_use]
    pub fn one_way(
        lat: f64,
        lon: f64,
        end: Option<(f64, f64)>,
        time_min: u32,
        radius_m: u32,
        cat_weights: CategoryWeightMap,
    ) -> Self {
        Self {
            roundtrip: false,
            end_lat: end.map(|(end_lat, _)| end_lat),
            end_lon: end.map(|(_, end_lon)| end_lon),
            ..Self::round_trip(lat, lon, time_min, radius_m, cat_weights)
        }
    }

    /// Override the routing engine.
    #[must_use]
    pub fn with_router(mut self, router: impl Into<String>, router_url: impl Into<String>) -> Self {
        self.router = router.into();
        self.router_url = router_url.into();
        self
    }

    /// Whether the returned path should be snapped to streets.
    #[must_use]
    pub fn with_snap_path(mut self, snap_path: bool) -> Self {
        self.snap_path = snap_path;
        self
    }

    /// Round trips never carry an end point.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.roundtrip {
            self.end_lat = None;
            self.end_lon = None;
        }
        self
    }
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Backend is up.
    pub ok: bool,
    /// Backend talks to real data and routing services rather than stubs.
    #[serde(default)]
    pub uses_real_stack: bool,
}

/// HTTP client for the tour backend.
#[derive(Debug, Clone)]
pub struct TourApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl TourApiClient {
    /// Client for the backend at `base_url`; a trailing slash is dropped.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base url without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Load scored points-of-interest around a location.
    ///
    /// # Errors
    ///
    /// Transport failures, non-2xx responses, and non-JSON bodies.
    pub async fn load_pois(&self, query: &PoiQuery) -> Result<Value, ClientError> {
        self.post_json("/api/pois", query).await
    }

    /// Build a tour; round trips are sent without an end point.
    ///
    /// # Errors
    ///
    /// Transport failures, non-2xx responses, and non-JSON bodies.
    pub async fn build_tour(&self, request: &TourRequest) -> Result<Value, ClientError> {
        let body = request.clone().normalized();
        self.post_json("/api/tour", &body).await
    }

    /// Probe backend liveness.
    ///
    /// # Errors
    ///
    /// Transport failures, non-2xx responses, and unexpected bodies.
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let res = self.client.get(self.endpoint("/api/health")).send().await?;
        let text = Self::success_text(res).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, "posting to tour backend");
        let res = self.client.post(&url).json(body).send().await?;
        let text = Self::success_text(res).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn success_text(res: reqwest::Response) -> Result<String, ClientError> {
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}
