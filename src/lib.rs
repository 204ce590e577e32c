//! # Walk Planner
//!
//! Personalized round-trip walk recommendations and visit bookkeeping.
//!
//! This library provides:
//! - Round-trip route recommendation for a target walking time, built from
//!   walkable points of interest (with a radial fallback) and an external router
//! - A personal pace model learned from recorded walks
//! - Place deduplication for logged visits (same place vs new place)
//! - Per-region visit intensity via point-in-polygon aggregation
//!
//! ## Features
//!
//! - **`http`** - OSRM and Overpass clients (enabled by default)
//! - **`persistence`** - SQLite key-value store (enabled by default)
//! - **`cli`** - `walk-planner` command line tool
//!
//! ## Quick Start
//!
//! ```rust
//! use walk_planner::{GeoPoint, PlaceMatcher, VisitCandidate, MatchConfig};
//! use chrono::Utc;
//!
//! let matcher = PlaceMatcher::new(MatchConfig::default());
//! let candidate = VisitCandidate {
//!     lat: 37.5665,
//!     lng: 126.9780,
//!     place_name: "Cafe Onion".to_string(),
//!     note: String::new(),
//!     visited_at: Utc::now(),
//!     place_id: None,
//! };
//! let record = matcher.create_visit(&candidate, Utc::now());
//! assert_eq!(record.visit_count, 1);
//!
//! let again = VisitCandidate { place_name: "cafe onion".to_string(), ..candidate };
//! assert!(matcher.find_match(std::slice::from_ref(&record), &again).is_some());
//! # let _ = GeoPoint::new(0.0, 0.0);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, WalkError};

// Tunables for recommendation and matching
pub mod config;
pub use config::{MatchConfig, RecommendConfig};

// Geographic utilities (distance, projection, bounds)
pub mod geo_utils;

// Place-name normalization and similarity
pub mod similarity;
pub use similarity::{name_similarity, normalize_place_name};

// Typed region geometry and ray-casting containment
pub mod polygon;
pub use polygon::{Polygon, RegionGeometry, Ring};

// Visit intensity per region
pub mod territory;
pub use territory::{aggregate_visit_counts, IntensityTier, RegionFeature, RegionSet};

// Opaque key-value persistence
pub mod store;
pub use store::{AvatarStore, KeyValueStore, MemoryStore};
#[cfg(feature = "persistence")]
pub use store::SqliteStore;

// Personal walking pace
pub mod pace;
pub use pace::{ObservedWalk, PaceModel, TrackPoint, WalkSession};

// Visit records and same-place matching
pub mod visits;
pub use visits::{
    parse_visited_at, PlaceMatcher, VisitBook, VisitCandidate, VisitRecord, VisitResolution,
};

// Waypoint candidate generation
pub mod candidates;
pub use candidates::{CandidateGenerator, PoiSource};

// Round-trip route fetching
pub mod fetcher;
pub use fetcher::{RouteCandidate, RouteFetcher, RoutingService};

// Route filtering and ranking
pub mod scorer;
pub use scorer::{RankedRoute, RecommendationResult, RouteScorer};

// Recommendation service with request generations
pub mod recommend;
pub use recommend::{one_way_distance, Generation, Recommender};

// Display helpers
pub mod format;

// HTTP clients for OSRM and Overpass
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{OsrmClient, OverpassClient};

/// Initialize logging for Android.
#[cfg(target_os = "android")]
pub fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("WalkPlannerRust"),
    );
}

#[cfg(not(target_os = "android"))]
pub fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate in degrees.
///
/// # Example
/// ```
/// use walk_planner::GeoPoint;
/// let point = GeoPoint::new(37.5665, 126.9780); // Seoul City Hall
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lng >= -180.0
            && self.lng <= 180.0
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from points. `None` for empty input.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
            min_lng = min_lng.min(p.lng);
            max_lng = max_lng.max(p.lng);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Inclusive containment test.
    #[inline]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lng >= self.min_lng
            && point.lng <= self.max_lng
            && point.lat >= self.min_lat
            && point.lat <= self.max_lat
    }
}
