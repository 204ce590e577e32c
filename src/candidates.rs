//! # Waypoint Candidate Generation
//!
//! Proposes turnaround points for round-trip walks.
//!
//! ## Pipeline
//!
//! | Step | What | Default |
//! |------|------|---------|
//! | Query | Walkable POIs (footways, paths, parks) around the start | radius `one_way × 2`, 9 s deadline |
//! | Dedup | One point per grid cell, last point in a cell wins | 0.0005° cells (~50 m) |
//! | Band | Keep points at `[0.6, 1.6] × one_way` from the start | |
//! | Rank | Closest to `one_way` first, keep the top 60 | |
//! | Shuffle | Fisher–Yates over the kept points, then truncate | 12 picks |
//! | Fallback | Under 6 picks, append a radial ring at `one_way` every 30° | |
//!
//! The POI query can fail or time out. Either way the generator proceeds with
//! an empty POI list and the radial ring fills in, so generation itself never
//! fails.
//!
//! ## Example
//!
//! ```rust
//! use walk_planner::candidates::{grid_dedup, radial_ring};
//! use walk_planner::GeoPoint;
//!
//! let start = GeoPoint::new(37.5665, 126.9780);
//! let ring = radial_ring(&start, 500.0, 30.0);
//! assert_eq!(ring.len(), 12);
//!
//! let dup = vec![start, GeoPoint::new(37.56651, 126.97801)];
//! assert_eq!(grid_dedup(&dup, 0.0005).len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::RecommendConfig;
use crate::geo_utils::{bearing_offset, haversine_distance};
use crate::{GeoPoint, Result, WalkError};

/// Angular spacing of the radial fallback ring.
pub const FALLBACK_STEP_DEG: f64 = 30.0;

/// Source of walkable points of interest.
#[async_trait]
pub trait PoiSource: Send + Sync {
    /// Walkable feature locations within `radius_m` of `center`.
    async fn walkable_points(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<GeoPoint>>;
}

/// Collapse points onto a coarse grid, one point per occupied cell.
///
/// Cells keep the order in which they were first seen; the point kept for a
/// cell is the last one that fell into it.
pub fn grid_dedup(points: &[GeoPoint], cell_deg: f64) -> Vec<GeoPoint> {
    let mut slots: HashMap<(i64, i64), usize> = HashMap::with_capacity(points.len());
    let mut kept: Vec<GeoPoint> = Vec::new();

    for p in points.iter().filter(|p| p.is_valid()) {
        let key = (
            (p.lat / cell_deg).round() as i64,
            (p.lng / cell_deg).round() as i64,
        );
        match slots.get(&key) {
            Some(&idx) => kept[idx] = *p,
            None => {
                slots.insert(key, kept.len());
                kept.push(*p);
            }
        }
    }

    kept
}

/// Points at `radius_m` from `center`, every `step_deg` degrees starting north.
pub fn radial_ring(center: &GeoPoint, radius_m: f64, step_deg: f64) -> Vec<GeoPoint> {
    let steps = (360.0 / step_deg).round() as usize;
    (0..steps)
        .map(|i| bearing_offset(center, radius_m, i as f64 * step_deg))
        .collect()
}

/// Produces waypoint candidates for a round trip.
pub struct CandidateGenerator {
    source: Arc<dyn PoiSource>,
    config: RecommendConfig,
}

impl CandidateGenerator {
    pub fn new(source: Arc<dyn PoiSource>, config: RecommendConfig) -> Self {
        Self { source, config }
    }

    /// Query the POI source under the configured deadline.
    ///
    /// Failures and timeouts yield an empty list.
    pub async fn fetch_walkable(&self, center: GeoPoint, one_way_m: f64) -> Vec<GeoPoint> {
        let radius = one_way_m * self.config.poi_radius_factor;
        let deadline = Duration::from_millis(self.config.poi_timeout_ms);

        let outcome = tokio::time::timeout(deadline, self.source.walkable_points(center, radius))
            .await
            .unwrap_or_else(|_| {
                Err(WalkError::Timeout {
                    operation: "poi query".to_string(),
                    after_ms: self.config.poi_timeout_ms,
                })
            });

        match outcome {
            Ok(points) => {
                debug!(
                    "[CandidateGenerator] POI query returned {} points within {:.0}m",
                    points.len(),
                    radius
                );
                points
            }
            Err(e) => {
                warn!("[CandidateGenerator] POI query failed, using fallback: {}", e);
                Vec::new()
            }
        }
    }

    /// Pick up to `max_pick` POIs near the one-way distance.
    pub fn select<R: Rng + ?Sized>(
        &self,
        center: &GeoPoint,
        points: &[GeoPoint],
        one_way_m: f64,
        rng: &mut R,
    ) -> Vec<GeoPoint> {
        let (low, high) = self.config.band;
        let (min_d, max_d) = (one_way_m * low, one_way_m * high);

        let mut in_band: Vec<(f64, GeoPoint)> = grid_dedup(points, self.config.grid_cell_deg)
            .into_iter()
            .map(|p| (haversine_distance(center, &p), p))
            .filter(|(d, _)| *d >= min_d && *d <= max_d)
            .collect();

        in_band.sort_by(|a, b| (a.0 - one_way_m).abs().total_cmp(&(b.0 - one_way_m).abs()));
        in_band.truncate(self.config.top_n);

        let mut picked: Vec<GeoPoint> = in_band.into_iter().map(|(_, p)| p).collect();
        picked.shuffle(rng);
        picked.truncate(self.config.max_pick);
        picked
    }

    /// Top up a short POI list with the radial ring.
    ///
    /// POI-derived waypoints stay first; the ring is appended in bearing
    /// order until `max_pick` is reached.
    pub fn with_fallback(
        &self,
        center: &GeoPoint,
        mut picked: Vec<GeoPoint>,
        one_way_m: f64,
    ) -> Vec<GeoPoint> {
        if picked.len() >= self.config.min_external {
            return picked;
        }

        let external = picked.len();
        picked.extend(radial_ring(center, one_way_m, FALLBACK_STEP_DEG));
        picked.truncate(self.config.max_pick);
        info!(
            "[CandidateGenerator] Only {} POI waypoints, appended {} radial waypoints",
            external,
            picked.len().saturating_sub(external)
        );
        picked
    }

    /// Full generation: query, select, fall back.
    pub async fn generate<R: Rng + ?Sized>(
        &self,
        center: GeoPoint,
        one_way_m: f64,
        rng: &mut R,
    ) -> Vec<GeoPoint> {
        let points = self.fetch_walkable(center, one_way_m).await;
        let picked = self.select(&center, &points, one_way_m, rng);
        self.with_fallback(&center, picked, one_way_m)
    }
}
