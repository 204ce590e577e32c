//! # Recommendation Service
//!
//! Composes the pipeline for one "walk for N minutes" request:
//!
//! ```text
//! PaceModel ─► target distance ─► CandidateGenerator ─► RouteFetcher ─► RouteScorer
//! ```
//!
//! ## Request generations
//!
//! Requests may overlap (the user changes the slider while a fetch is still
//! running). Every request takes a [`Generation`] from [`Recommender::begin`];
//! [`Recommender::commit`] only stores a result whose generation is the newest
//! one issued. Older requests still run to completion, but their results are
//! discarded with [`WalkError::Superseded`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};
use rand::Rng;
use tokio::sync::{Mutex, RwLock};

use crate::candidates::{CandidateGenerator, PoiSource};
use crate::config::RecommendConfig;
use crate::fetcher::{RouteFetcher, RoutingService};
use crate::pace::{ObservedWalk, PaceModel};
use crate::scorer::{RecommendationResult, RouteScorer};
use crate::{GeoPoint, Result, WalkError};

/// Shortest one-way leg, meters.
pub const MIN_ONE_WAY_M: f64 = 200.0;

/// Longest one-way leg for a requested walk time.
pub fn max_one_way(minutes: u32) -> f64 {
    match minutes {
        0..=20 => 700.0,
        21..=30 => 900.0,
        _ => 1300.0,
    }
}

/// Distance from the start to the turnaround point.
///
/// Half the round-trip target, kept within `[200, max_one_way(minutes)]`.
pub fn one_way_distance(minutes: u32, target_distance_m: f64) -> f64 {
    (target_distance_m / 2.0).clamp(MIN_ONE_WAY_M, max_one_way(minutes))
}

/// Monotonic id of a recommendation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Default)]
struct Committed {
    generation: u64,
    result: Option<RecommendationResult>,
}

/// The recommendation service.
pub struct Recommender {
    config: RecommendConfig,
    pace: RwLock<PaceModel>,
    generator: CandidateGenerator,
    fetcher: RouteFetcher,
    scorer: RouteScorer,
    issued: AtomicU64,
    committed: Mutex<Committed>,
}

impl Recommender {
    pub fn new(
        config: RecommendConfig,
        pace: PaceModel,
        pois: Arc<dyn PoiSource>,
        router: Arc<dyn RoutingService>,
    ) -> Self {
        Self {
            generator: CandidateGenerator::new(pois, config.clone()),
            fetcher: RouteFetcher::new(router, config.batch_size),
            scorer: RouteScorer::from_config(&config),
            config,
            pace: RwLock::new(pace),
            issued: AtomicU64::new(0),
            committed: Mutex::new(Committed::default()),
        }
    }

    pub fn config(&self) -> &RecommendConfig {
        &self.config
    }

    /// Current pace, meters per minute.
    pub async fn meters_per_minute(&self) -> f64 {
        self.pace.read().await.meters_per_minute()
    }

    /// Blend a completed walk into the pace. See [`PaceModel::update`].
    pub async fn record_walk(&self, walk: &ObservedWalk) -> Option<f64> {
        self.pace.write().await.update(walk)
    }

    /// Issue the next request generation.
    pub fn begin(&self) -> Generation {
        Generation(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Store `result` as the latest recommendation if `generation` is the
    /// newest one issued.
    pub async fn commit(&self, generation: Generation, result: RecommendationResult) -> Result<()> {
        let mut committed = self.committed.lock().await;
        let latest = self.issued.load(Ordering::SeqCst).max(committed.generation);

        if generation.0 < latest || generation.0 <= committed.generation {
            info!(
                "[Recommender] Discarding result #{} (latest #{})",
                generation.0, latest
            );
            return Err(WalkError::Superseded {
                generation: generation.0,
                latest,
            });
        }

        committed.generation = generation.0;
        committed.result = Some(result);
        Ok(())
    }

    /// The last committed recommendation.
    pub async fn latest(&self) -> Option<RecommendationResult> {
        self.committed.lock().await.result.clone()
    }

    /// Run one recommendation request for a walk of `minutes` from `start`.
    pub async fn recommend<R: Rng + ?Sized>(
        &self,
        start: GeoPoint,
        minutes: u32,
        rng: &mut R,
    ) -> Result<RecommendationResult> {
        if minutes == 0 {
            return Err(WalkError::InvalidInput {
                message: "walk time must be at least one minute".to_string(),
            });
        }
        if !start.is_valid() {
            return Err(WalkError::InvalidInput {
                message: format!("invalid start point ({}, {})", start.lat, start.lng),
            });
        }

        let generation = self.begin();
        let target_distance_m = self.pace.read().await.target_distance(minutes as f64);
        let one_way_m = one_way_distance(minutes, target_distance_m);
        debug!(
            "[Recommender] #{}: {} min, target {:.0}m, one-way {:.0}m",
            generation.0, minutes, target_distance_m, one_way_m
        );

        let waypoints = self.generator.generate(start, one_way_m, rng).await;
        let routes = self.fetcher.fetch_all(start, &waypoints).await?;
        let result = self.scorer.rank(routes, minutes, target_distance_m)?;

        self.commit(generation, result.clone()).await?;
        info!(
            "[Recommender] #{}: {} routes for {} min",
            generation.0,
            result.routes.len(),
            minutes
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::{RankedRoute, RouteCandidate};
    use async_trait::async_trait;

    struct NoPois;

    #[async_trait]
    impl PoiSource for NoPois {
        async fn walkable_points(
            &self,
            _center: GeoPoint,
            _radius_m: f64,
        ) -> Result<Vec<GeoPoint>> {
            Ok(Vec::new())
        }
    }

    struct NoRoutes;

    #[async_trait]
    impl RoutingService for NoRoutes {
        async fn round_trip(
            &self,
            _start: GeoPoint,
            _waypoint: GeoPoint,
        ) -> Result<RouteCandidate> {
            Err(WalkError::Network {
                message: "unreachable".to_string(),
                status_code: None,
            })
        }
    }

    fn recommender() -> Recommender {
        Recommender::new(
            RecommendConfig::default(),
            PaceModel::load(Arc::new(MemoryStore::new())),
            Arc::new(NoPois),
            Arc::new(NoRoutes),
        )
    }

    fn result(minutes: u32) -> RecommendationResult {
        RecommendationResult {
            minutes,
            target_distance_m: minutes as f64 * 50.0,
            target_duration_sec: minutes as f64 * 60.0,
            routes: vec![RankedRoute {
                id: "r1".to_string(),
                title: String::new(),
                duration_sec: 0.0,
                distance_m: 0.0,
                polyline: Vec::new(),
                score: 0.0,
            }],
        }
    }

    #[test]
    fn test_one_way_clamp() {
        assert_eq!(one_way_distance(20, 1000.0), 500.0);
        assert_eq!(one_way_distance(20, 2000.0), 700.0);
        assert_eq!(one_way_distance(30, 2000.0), 900.0);
        assert_eq!(one_way_distance(45, 4000.0), 1300.0);
        assert_eq!(one_way_distance(5, 250.0), 200.0);
    }

    #[tokio::test]
    async fn test_newest_generation_wins() {
        let rec = recommender();
        let g1 = rec.begin();
        let g2 = rec.begin();
        assert!(g2 > g1);

        rec.commit(g2, result(30)).await.unwrap();
        let err = rec.commit(g1, result(10)).await.unwrap_err();
        assert_eq!(
            err,
            WalkError::Superseded {
                generation: g1.value(),
                latest: g2.value()
            }
        );
        assert_eq!(rec.latest().await.map(|r| r.minutes), Some(30));
    }

    #[tokio::test]
    async fn test_older_generation_discarded_before_newer_finishes() {
        let rec = recommender();
        let g1 = rec.begin();
        let _g2 = rec.begin();

        assert!(matches!(
            rec.commit(g1, result(10)).await,
            Err(WalkError::Superseded { .. })
        ));
        assert!(rec.latest().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_request_commits_nothing() {
        let rec = recommender();
        let mut rng = rand::rng();
        let err = rec
            .recommend(GeoPoint::new(37.5665, 126.9780), 20, &mut rng)
            .await
            .unwrap_err();
        assert_eq!(err, WalkError::NoRouteFound { attempted: 12 });
        assert!(rec.latest().await.is_none());
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let rec = recommender();
        let mut rng = rand::rng();
        assert!(matches!(
            rec.recommend(GeoPoint::new(37.5, 127.0), 0, &mut rng).await,
            Err(WalkError::InvalidInput { .. })
        ));
        assert!(matches!(
            rec.recommend(GeoPoint::new(f64::NAN, 127.0), 20, &mut rng).await,
            Err(WalkError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_record_walk_moves_target() {
        let rec = recommender();
        assert_eq!(rec.meters_per_minute().await, 50.0);
        let walk = ObservedWalk {
            point_count: 11,
            distance_m: 700.0,
            duration_min: 10.0,
        };
        assert_eq!(rec.record_walk(&walk).await, Some(55.0));
        assert_eq!(rec.meters_per_minute().await, 55.0);
    }
}
