//! # Route Scoring
//!
//! Filters fetched round trips to the target distance band and ranks the
//! survivors by a weighted distance from the target:
//!
//! ```text
//! score = |duration - target_duration| * 1.2 + |distance - target_distance| * 0.4
//! ```
//!
//! Lower is better. The weights are fixed.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::RecommendConfig;
use crate::fetcher::RouteCandidate;
use crate::{Bounds, GeoPoint, Result, WalkError};

/// Weight per second of duration error.
pub const DURATION_WEIGHT: f64 = 1.2;
/// Weight per meter of distance error.
pub const DISTANCE_WEIGHT: f64 = 0.4;

/// One recommended route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRoute {
    /// `r1`, `r2`, ... by rank.
    pub id: String,
    pub title: String,
    pub duration_sec: f64,
    pub distance_m: f64,
    pub polyline: Vec<GeoPoint>,
    pub score: f64,
}

impl RankedRoute {
    /// Bounding box of the polyline, for fitting the map view.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.polyline)
    }
}

/// Ranked routes for one request, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub minutes: u32,
    pub target_distance_m: f64,
    pub target_duration_sec: f64,
    pub routes: Vec<RankedRoute>,
}

impl RecommendationResult {
    pub fn best(&self) -> Option<&RankedRoute> {
        self.routes.first()
    }
}

/// Band filter and weighted ranking.
#[derive(Debug, Clone, Copy)]
pub struct RouteScorer {
    band: (f64, f64),
    results: usize,
}

impl Default for RouteScorer {
    fn default() -> Self {
        Self::from_config(&RecommendConfig::default())
    }
}

impl RouteScorer {
    pub fn new(band: (f64, f64), results: usize) -> Self {
        Self { band, results }
    }

    pub fn from_config(config: &RecommendConfig) -> Self {
        Self::new(config.band, config.results)
    }

    /// Weighted error of one route against the target.
    pub fn score(route: &RouteCandidate, target_distance_m: f64, target_duration_sec: f64) -> f64 {
        (route.duration_sec - target_duration_sec).abs() * DURATION_WEIGHT
            + (route.distance_m - target_distance_m).abs() * DISTANCE_WEIGHT
    }

    /// Whether a route's length is acceptable for the target.
    pub fn in_band(&self, route: &RouteCandidate, target_distance_m: f64) -> bool {
        route.distance_m >= target_distance_m * self.band.0
            && route.distance_m <= target_distance_m * self.band.1
    }

    /// Filter, score and rank.
    ///
    /// Ties keep fetch order. Returns [`WalkError::NoCandidateInBand`] when
    /// nothing survives the band filter.
    pub fn rank(
        &self,
        routes: Vec<RouteCandidate>,
        minutes: u32,
        target_distance_m: f64,
    ) -> Result<RecommendationResult> {
        let target_duration_sec = minutes as f64 * 60.0;
        let fetched = routes.len();

        let mut scored: Vec<(f64, RouteCandidate)> = routes
            .into_iter()
            .filter(|r| self.in_band(r, target_distance_m))
            .map(|r| (Self::score(&r, target_distance_m, target_duration_sec), r))
            .collect();

        if scored.is_empty() {
            warn!(
                "[RouteScorer] None of {} routes within band of {:.0}m",
                fetched, target_distance_m
            );
            return Err(WalkError::NoCandidateInBand {
                fetched,
                target_distance_m,
            });
        }

        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(self.results);

        let routes: Vec<RankedRoute> = scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, r))| RankedRoute {
                id: format!("r{}", i + 1),
                title: route_title(minutes, target_distance_m, i + 1),
                duration_sec: r.duration_sec,
                distance_m: r.distance_m,
                polyline: r.polyline,
                score,
            })
            .collect();

        debug!(
            "[RouteScorer] Ranked {} of {} routes, best score {:.1}",
            routes.len(),
            fetched,
            routes.first().map(|r| r.score).unwrap_or_default()
        );

        Ok(RecommendationResult {
            minutes,
            target_distance_m,
            target_duration_sec,
            routes,
        })
    }
}

/// Display title for a ranked route.
pub fn route_title(minutes: u32, target_distance_m: f64, rank: usize) -> String {
    format!(
        "{} min (≈{} m) pick {}",
        minutes,
        target_distance_m.round() as i64,
        rank
    )
}
