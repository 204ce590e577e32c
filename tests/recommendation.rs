//! Recommendation pipeline integration tests.
//!
//! Runs the full pace -> candidates -> fetch -> score flow against in-process
//! POI and routing fakes. Time is paused, so simulated latency costs nothing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use walk_planner::geo_utils::{bearing_offset, haversine_distance};
use walk_planner::{
    GeoPoint, MemoryStore, PaceModel, PoiSource, RecommendConfig, Recommender, Result,
    RouteCandidate, RoutingService, WalkError,
};

/// Returns a ring of POIs at half the search radius (the one-way distance).
struct RingPois;

#[async_trait]
impl PoiSource for RingPois {
    async fn walkable_points(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<GeoPoint>> {
        Ok((0..12)
            .map(|i| bearing_offset(&center, radius_m / 2.0, 15.0 + i as f64 * 30.0))
            .collect())
    }
}

/// Routes are `stretch` times the straight out-and-back distance, walked at
/// 60 m/min. Short legs answer slowly.
struct StraightRouter {
    stretch: f64,
}

#[async_trait]
impl RoutingService for StraightRouter {
    async fn round_trip(&self, start: GeoPoint, waypoint: GeoPoint) -> Result<RouteCandidate> {
        let leg = haversine_distance(&start, &waypoint);
        let delay = if leg < 600.0 { 5 } else { 1 };
        tokio::time::sleep(Duration::from_secs(delay)).await;

        let distance_m = 2.0 * leg * self.stretch;
        Ok(RouteCandidate {
            waypoint,
            duration_sec: distance_m,
            distance_m,
            polyline: vec![start, waypoint, start],
        })
    }
}

fn recommender(stretch: f64) -> Recommender {
    Recommender::new(
        RecommendConfig::default(),
        PaceModel::load(Arc::new(MemoryStore::new())),
        Arc::new(RingPois),
        Arc::new(StraightRouter { stretch }),
    )
}

fn seoul() -> GeoPoint {
    GeoPoint::new(37.5665, 126.9780)
}

#[tokio::test(start_paused = true)]
async fn test_recommends_three_ranked_routes() {
    let rec = recommender(1.0);
    let mut rng = StdRng::seed_from_u64(11);

    // Default pace 50 m/min: 20 min -> 1000 m target, 500 m one-way
    let result = rec.recommend(seoul(), 20, &mut rng).await.unwrap();

    assert_eq!(result.target_distance_m, 1000.0);
    assert_eq!(result.target_duration_sec, 1200.0);
    assert_eq!(result.routes.len(), 3);

    let ids: Vec<_> = result.routes.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r2", "r3"]);
    assert!(result.routes.windows(2).all(|w| w[0].score <= w[1].score));
    assert_eq!(result.routes[0].title, "20 min (≈1000 m) pick 1");
    for route in &result.routes {
        assert!(route.distance_m >= 600.0 && route.distance_m <= 1600.0);
        assert_eq!(route.polyline.first(), Some(&seoul()));
    }

    assert_eq!(rec.latest().await, Some(result));
}

#[tokio::test(start_paused = true)]
async fn test_same_seed_same_result() {
    let a = recommender(1.1)
        .recommend(seoul(), 25, &mut StdRng::seed_from_u64(99))
        .await
        .unwrap();
    let b = recommender(1.1)
        .recommend(seoul(), 25, &mut StdRng::seed_from_u64(99))
        .await
        .unwrap();
    assert_eq!(a, b);
}

#[tokio::test(start_paused = true)]
async fn test_routes_out_of_band() {
    // Every route is five times the target
    let rec = recommender(5.0);
    let err = rec
        .recommend(seoul(), 20, &mut StdRng::seed_from_u64(1))
        .await
        .unwrap_err();

    assert!(matches!(err, WalkError::NoCandidateInBand { fetched: 12, .. }));
    assert!(err.notice().is_some());
    assert!(rec.latest().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_slow_superseded_request_is_discarded() {
    let rec = recommender(1.0);
    let mut rng_a = StdRng::seed_from_u64(1);
    let mut rng_b = StdRng::seed_from_u64(2);

    // 20 min (500 m legs, slow router) starts first; 30 min (750 m legs, fast)
    // starts second and finishes first.
    let (a, b) = tokio::join!(
        rec.recommend(seoul(), 20, &mut rng_a),
        rec.recommend(seoul(), 30, &mut rng_b),
    );

    let b = b.unwrap();
    assert_eq!(b.minutes, 30);
    assert!(matches!(
        a,
        Err(WalkError::Superseded {
            generation: 1,
            latest: 2
        })
    ));
    assert_eq!(rec.latest().await.map(|r| r.minutes), Some(30));
}

#[tokio::test(start_paused = true)]
async fn test_learned_pace_changes_target() {
    let rec = recommender(1.0);
    let walk = walk_planner::ObservedWalk {
        point_count: 30,
        distance_m: 1800.0,
        duration_min: 20.0,
    };
    // 50 * 0.75 + 90 * 0.25
    assert_eq!(rec.record_walk(&walk).await, Some(60.0));

    let result = rec
        .recommend(seoul(), 20, &mut StdRng::seed_from_u64(5))
        .await
        .unwrap();
    assert_eq!(result.target_distance_m, 1200.0);
    assert_eq!(result.routes[0].title, "20 min (≈1200 m) pick 1");
}
