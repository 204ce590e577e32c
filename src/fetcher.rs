//! # Round-Trip Route Fetching
//!
//! Resolves a closed walk `start → waypoint → start` for every candidate
//! through an external [`RoutingService`].
//!
//! Requests go out in fixed-size batches. A batch settles completely (every
//! request succeeds or fails) before the next one starts, so at most
//! `batch_size` calls are ever in flight. Failed requests drop their waypoint
//! and nothing else; only when every request fails does the fetch as a whole
//! report [`WalkError::NoRouteFound`].

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{GeoPoint, Result, WalkError};

/// A fetched round trip through one waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub waypoint: GeoPoint,
    pub duration_sec: f64,
    pub distance_m: f64,
    /// Route order; starts and ends at (or near) the start point.
    pub polyline: Vec<GeoPoint>,
}

/// External walking router.
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// Closed walking route `start → waypoint → start`.
    async fn round_trip(&self, start: GeoPoint, waypoint: GeoPoint) -> Result<RouteCandidate>;
}

/// Batched, settle-all route fetcher.
pub struct RouteFetcher {
    service: Arc<dyn RoutingService>,
    batch_size: usize,
}

impl RouteFetcher {
    pub fn new(service: Arc<dyn RoutingService>, batch_size: usize) -> Self {
        Self {
            service,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Fetch a round trip for every waypoint, keeping the ones that succeed.
    ///
    /// Results keep waypoint order.
    pub async fn fetch_all(
        &self,
        start: GeoPoint,
        waypoints: &[GeoPoint],
    ) -> Result<Vec<RouteCandidate>> {
        let started = Instant::now();
        let mut routes = Vec::with_capacity(waypoints.len());

        for (batch_idx, batch) in waypoints.chunks(self.batch_size).enumerate() {
            let settled = join_all(
                batch
                    .iter()
                    .map(|wp| self.service.round_trip(start, *wp)),
            )
            .await;

            let before = routes.len();
            for (wp, outcome) in batch.iter().zip(settled) {
                match outcome {
                    Ok(route) => routes.push(route),
                    Err(e) => debug!(
                        "[RouteFetcher] Dropping waypoint ({:.5}, {:.5}): {}",
                        wp.lat, wp.lng, e
                    ),
                }
            }
            debug!(
                "[RouteFetcher] Batch {}: {}/{} routes",
                batch_idx + 1,
                routes.len() - before,
                batch.len()
            );
        }

        if routes.is_empty() {
            warn!(
                "[RouteFetcher] No route for any of {} waypoints",
                waypoints.len()
            );
            return Err(WalkError::NoRouteFound {
                attempted: waypoints.len(),
            });
        }

        info!(
            "[RouteFetcher] Fetched {}/{} routes in {:.2}s",
            routes.len(),
            waypoints.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(routes)
    }
}
