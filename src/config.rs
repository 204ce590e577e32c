//! Configuration for recommendation and visit matching.
//!
//! Both structs carry documented defaults and can be overlaid from a partial
//! JSON document. The route scoring weights are not configurable: they are
//! fixed constants in [`crate::scorer`].

use serde::{Deserialize, Serialize};

use crate::{Result, WalkError};

/// Environment variable overriding [`RecommendConfig::routing_base`].
pub const ENV_ROUTING_BASE: &str = "WALK_PLANNER_ROUTING_BASE";
/// Environment variable overriding [`RecommendConfig::poi_endpoint`].
pub const ENV_POI_ENDPOINT: &str = "WALK_PLANNER_POI_ENDPOINT";

/// Configuration for the recommendation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// Base URL of the OSRM-compatible routing service.
    /// Default: "https://router.project-osrm.org"
    pub routing_base: String,

    /// Overpass interpreter endpoint for walkable POIs.
    /// Default: "https://overpass-api.de/api/interpreter"
    pub poi_endpoint: String,

    /// Deadline for the POI query. On expiry the radial fallback is used.
    /// Default: 9000 ms
    pub poi_timeout_ms: u64,

    /// Routing requests in flight per batch. Batches run one after another.
    /// Default: 6
    pub batch_size: usize,

    /// Waypoint candidates handed to the route fetcher.
    /// Default: 12
    pub max_pick: usize,

    /// Below this many POI-derived waypoints the radial fallback kicks in.
    /// Default: 6
    pub min_external: usize,

    /// Closest-to-target POIs kept before shuffling.
    /// Default: 60
    pub top_n: usize,

    /// Grid cell size (degrees) for POI deduplication. 0.0005° ≈ 50 m.
    /// Default: 0.0005
    pub grid_cell_deg: f64,

    /// POI search radius as a multiple of the one-way distance.
    /// Default: 2.0
    pub poi_radius_factor: f64,

    /// Accepted distance band as fractions of the target `(low, high)`.
    /// Used for both waypoint selection and route filtering.
    /// Default: (0.6, 1.6)
    pub band: (f64, f64),

    /// Number of ranked routes returned.
    /// Default: 3
    pub results: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            routing_base: "https://router.project-osrm.org".to_string(),
            poi_endpoint: "https://overpass-api.de/api/interpreter".to_string(),
            poi_timeout_ms: 9_000,
            batch_size: 6,
            max_pick: 12,
            min_external: 6,
            top_n: 60,
            grid_cell_deg: 0.0005,
            poi_radius_factor: 2.0,
            band: (0.6, 1.6),
            results: 3,
        }
    }
}

impl RecommendConfig {
    /// Parse a (possibly partial) JSON document over the defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| WalkError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `WALK_PLANNER_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base) = std::env::var(ENV_ROUTING_BASE) {
            if !base.trim().is_empty() {
                self.routing_base = base.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(endpoint) = std::env::var(ENV_POI_ENDPOINT) {
            if !endpoint.trim().is_empty() {
                self.poi_endpoint = endpoint.trim().to_string();
            }
        }
        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(config_error("batch_size must be at least 1"));
        }
        if self.max_pick == 0 {
            return Err(config_error("max_pick must be at least 1"));
        }
        if self.results == 0 {
            return Err(config_error("results must be at least 1"));
        }
        let (low, high) = self.band;
        if !(low.is_finite() && high.is_finite()) || low < 0.0 || low > high {
            return Err(config_error("band must satisfy 0 <= low <= high"));
        }
        if !(self.grid_cell_deg > 0.0) {
            return Err(config_error("grid_cell_deg must be positive"));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> WalkError {
    WalkError::Config {
        message: message.to_string(),
    }
}

/// Configuration for same-place detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Maximum distance between two visits of the same place (inclusive).
    /// Default: 50.0 meters
    pub radius_m: f64,

    /// Minimum name similarity for a proximity match (inclusive).
    /// Default: 0.86
    pub sim_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            radius_m: 50.0,
            sim_threshold: 0.86,
        }
    }
}
