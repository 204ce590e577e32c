//! HTTP clients for the external routing and POI services.
//!
//! - [`OsrmClient`] - round-trip walking routes from an OSRM-compatible router
//! - [`OverpassClient`] - walkable features (footways, paths, parks) from an
//!   Overpass interpreter
//!
//! Both share one connection-pooled `reqwest` client configuration. Neither
//! retries: a failed routing call just drops its waypoint, and a failed POI
//! query switches the generator to its radial fallback.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::candidates::PoiSource;
use crate::config::RecommendConfig;
use crate::fetcher::{RouteCandidate, RoutingService};
use crate::{GeoPoint, Result, WalkError};

// Connection settings
const MAX_IDLE_PER_HOST: usize = 6; // One routing batch
const USER_AGENT: &str = concat!("walk-planner/", env!("CARGO_PKG_VERSION"));

fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder()
        .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
        .user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
        .map_err(|e| WalkError::Config {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

fn network_error(err: reqwest::Error) -> WalkError {
    WalkError::Network {
        message: err.to_string(),
        status_code: err.status().map(|s| s.as_u16()),
    }
}

// ============================================================================
// OSRM routing
// ============================================================================

/// OSRM `route` response, only the fields we read.
#[derive(Debug, Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    duration: f64,
    distance: f64,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// `[lng, lat]` pairs.
    coordinates: Vec<[f64; 2]>,
}

/// Walking router speaking the OSRM HTTP API.
pub struct OsrmClient {
    client: Client,
    base: String,
}

impl OsrmClient {
    /// Routing calls carry no deadline of their own; a hung call only holds
    /// up its batch.
    pub fn new(base: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(None)?,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &RecommendConfig) -> Result<Self> {
        Self::new(&config.routing_base)
    }

    /// `start → waypoint → start` on the foot profile, full GeoJSON geometry.
    pub fn round_trip_url(&self, start: &GeoPoint, waypoint: &GeoPoint) -> String {
        format!(
            "{}/route/v1/foot/{},{};{},{};{},{}?overview=full&geometries=geojson&steps=false",
            self.base, start.lng, start.lat, waypoint.lng, waypoint.lat, start.lng, start.lat
        )
    }
}

/// Turn an OSRM response body into a route through `waypoint`.
fn parse_osrm(body: OsrmResponse, waypoint: GeoPoint) -> Result<RouteCandidate> {
    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| WalkError::Network {
            message: "response has no routes".to_string(),
            status_code: None,
        })?;

    Ok(RouteCandidate {
        waypoint,
        duration_sec: route.duration,
        distance_m: route.distance,
        polyline: route
            .geometry
            .coordinates
            .into_iter()
            .map(|[lng, lat]| GeoPoint::new(lat, lng))
            .collect(),
    })
}

#[async_trait]
impl RoutingService for OsrmClient {
    async fn round_trip(&self, start: GeoPoint, waypoint: GeoPoint) -> Result<RouteCandidate> {
        let url = self.round_trip_url(&start, &waypoint);
        let resp = self.client.get(&url).send().await.map_err(network_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WalkError::Network {
                message: format!("routing request failed: {}", status),
                status_code: Some(status.as_u16()),
            });
        }

        let body: OsrmResponse = resp.json().await.map_err(network_error)?;
        parse_osrm(body, waypoint)
    }
}

// ============================================================================
// Overpass POIs
// ============================================================================

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

/// Nodes carry `lat`/`lon`; ways and relations carry `center`.
#[derive(Debug, Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    fn position(&self) -> Option<GeoPoint> {
        match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => Some(GeoPoint::new(lat, lon)),
            (_, _, Some(c)) => Some(GeoPoint::new(c.lat, c.lon)),
            _ => None,
        }
    }
}

/// Overpass QL for walkable ways and parks around `center`.
pub fn walkable_query(center: &GeoPoint, radius_m: f64) -> String {
    let around = format!("around:{:.0},{},{}", radius_m, center.lat, center.lng);
    let mut query = String::from("[out:json][timeout:8];\n(\n");
    for filter in [r#"["highway"~"^(footway|path|pedestrian)$"]"#, r#"["leisure"="park"]"#] {
        for kind in ["node", "way", "relation"] {
            query.push_str(&format!("  {}({}){};\n", kind, around, filter));
        }
    }
    query.push_str(");\nout center;\n");
    query
}

/// Walkable POI source backed by an Overpass interpreter.
pub struct OverpassClient {
    client: Client,
    endpoint: String,
}

impl OverpassClient {
    /// The query deadline is enforced by the caller; `timeout` here only
    /// guards against a stuck connection.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(Some(timeout))?,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn from_config(config: &RecommendConfig) -> Result<Self> {
        Self::new(
            &config.poi_endpoint,
            Duration::from_millis(config.poi_timeout_ms),
        )
    }
}

#[async_trait]
impl PoiSource for OverpassClient {
    async fn walkable_points(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<GeoPoint>> {
        let query = walkable_query(&center, radius_m);
        let resp = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .map_err(network_error)?;

        let status = resp.status();
        if !status.is_success() {
            warn!("[OverpassClient] POI query returned {}", status);
            return Err(WalkError::Network {
                message: format!("poi query failed: {}", status),
                status_code: Some(status.as_u16()),
            });
        }

        let body: OverpassResponse = resp.json().await.map_err(network_error)?;
        let total = body.elements.len();
        let points: Vec<GeoPoint> = body
            .elements
            .iter()
            .filter_map(OverpassElement::position)
            .collect();

        debug!(
            "[OverpassClient] {} of {} elements have coordinates",
            points.len(),
            total
        );
        Ok(points)
    }
}
