//! # Personal Pace
//!
//! Learns the user's walking speed (meters per minute) from completed walks
//! and converts a requested walk time into a target distance.
//!
//! ## Update rule
//!
//! A walk only counts when it is long enough to say something about pace:
//! at least [`MIN_TRACK_POINTS`] recorded points, more than
//! [`MIN_DURATION_MIN`] minutes, and more than [`MIN_DISTANCE_M`] meters.
//! The observed speed is clipped to `[25, 110]` m/min and blended in with a
//! fixed smoothing factor:
//!
//! ```text
//! next = current * 0.75 + clipped * 0.25
//! ```
//!
//! The new value is persisted immediately and is live for the next
//! recommendation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::geo_utils::polyline_length;
use crate::store::{KeyValueStore, PACE_KEY};
use crate::GeoPoint;

/// Pace used when nothing valid is persisted (20 minutes per kilometer).
pub const DEFAULT_PACE_MPM: f64 = 50.0;
/// Persisted values outside this open interval are discarded on load.
pub const VALID_PACE_RANGE: (f64, f64) = (20.0, 120.0);
/// Observed speeds are clipped into this closed interval before blending.
pub const OBSERVED_CLIP: (f64, f64) = (25.0, 110.0);
/// Weight of a new observation.
pub const SMOOTHING: f64 = 0.25;

pub const MIN_TRACK_POINTS: usize = 10;
pub const MIN_DURATION_MIN: f64 = 3.0;
pub const MIN_DISTANCE_M: f64 = 200.0;

/// A recorded position during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lng: f64,
    /// Milliseconds since the Unix epoch.
    pub t_ms: i64,
}

impl TrackPoint {
    pub fn new(lat: f64, lng: f64, t_ms: i64) -> Self {
        Self { lat, lng, t_ms }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Summary of a completed walk, as seen by the pace model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservedWalk {
    pub point_count: usize,
    /// Sum of consecutive haversine segments.
    pub distance_m: f64,
    /// Last timestamp minus first, in minutes.
    pub duration_min: f64,
}

impl ObservedWalk {
    pub fn from_track(points: &[TrackPoint]) -> Self {
        let path: Vec<GeoPoint> = points.iter().map(TrackPoint::position).collect();
        let distance_m = polyline_length(&path);

        let duration_min = match (points.first(), points.last()) {
            (Some(first), Some(last)) => (last.t_ms - first.t_ms) as f64 / 60_000.0,
            _ => 0.0,
        };

        Self {
            point_count: points.len(),
            distance_m,
            duration_min,
        }
    }

    /// Whether this walk is long enough to update the pace.
    pub fn qualifies(&self) -> bool {
        self.point_count >= MIN_TRACK_POINTS
            && self.duration_min > MIN_DURATION_MIN
            && self.distance_m > MIN_DISTANCE_M
    }

    /// Observed speed in meters per minute, before clipping.
    pub fn meters_per_minute(&self) -> f64 {
        self.distance_m / self.duration_min
    }
}

/// Accumulates positions while the user walks.
#[derive(Debug, Clone, Default)]
pub struct WalkSession {
    points: Vec<TrackPoint>,
}

impl WalkSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, point: TrackPoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// The latest recorded position, used as the start of a recommendation.
    pub fn current_position(&self) -> Option<GeoPoint> {
        self.points.last().map(TrackPoint::position)
    }

    /// Finish the walk and summarize it.
    pub fn finish(self) -> ObservedWalk {
        ObservedWalk::from_track(&self.points)
    }
}

/// The user's learned pace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaceProfile {
    pub meters_per_minute: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Persisted, exponentially smoothed walking speed.
pub struct PaceModel {
    store: Arc<dyn KeyValueStore>,
    profile: PaceProfile,
}

impl PaceModel {
    /// Load the persisted pace.
    ///
    /// Absent, non-numeric or out-of-range values (and read failures) fall
    /// back to [`DEFAULT_PACE_MPM`].
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let raw = match store.get(PACE_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("[PaceModel] Failed to read persisted pace, using default: {}", e);
                None
            }
        };

        let meters_per_minute = match raw.as_deref().map(|s| s.trim().parse::<f64>()) {
            Some(Ok(v)) if v.is_finite() && v > VALID_PACE_RANGE.0 && v < VALID_PACE_RANGE.1 => v,
            Some(_) => {
                warn!("[PaceModel] Discarding persisted pace {:?}", raw);
                DEFAULT_PACE_MPM
            }
            None => DEFAULT_PACE_MPM,
        };

        debug!("[PaceModel] Loaded pace {:.1} m/min", meters_per_minute);
        Self {
            store,
            profile: PaceProfile {
                meters_per_minute,
                last_updated: None,
            },
        }
    }

    pub fn meters_per_minute(&self) -> f64 {
        self.profile.meters_per_minute
    }

    pub fn profile(&self) -> PaceProfile {
        self.profile
    }

    /// Distance covered in `minutes` at the current pace.
    pub fn target_distance(&self, minutes: f64) -> f64 {
        minutes * self.profile.meters_per_minute
    }

    /// Blend a completed walk into the pace.
    ///
    /// Returns the new pace, or `None` when the walk does not qualify. A
    /// failed save is logged; the new value stays live in memory.
    pub fn update(&mut self, walk: &ObservedWalk) -> Option<f64> {
        if !walk.qualifies() {
            debug!(
                "[PaceModel] Ignoring walk: {} points, {:.1} min, {:.0} m",
                walk.point_count, walk.duration_min, walk.distance_m
            );
            return None;
        }

        let observed = walk
            .meters_per_minute()
            .clamp(OBSERVED_CLIP.0, OBSERVED_CLIP.1);
        let current = self.profile.meters_per_minute;
        let next = current * (1.0 - SMOOTHING) + observed * SMOOTHING;

        self.profile = PaceProfile {
            meters_per_minute: next,
            last_updated: Some(Utc::now()),
        };

        if let Err(e) = self.store.set(PACE_KEY, &next.to_string()) {
            warn!("[PaceModel] Failed to persist pace {:.1}: {}", next, e);
        }

        info!(
            "[PaceModel] Pace {:.1} -> {:.1} m/min (observed {:.1})",
            current, next, observed
        );
        Some(next)
    }

    /// Convenience for [`PaceModel::update`] straight from a track.
    pub fn update_from_track(&mut self, points: &[TrackPoint]) -> Option<f64> {
        self.update(&ObservedWalk::from_track(points))
    }
}
