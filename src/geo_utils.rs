//! # Geographic Utilities
//!
//! Core geographic computations shared by the recommendation pipeline, the
//! pace model and the visit matcher.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points |
//! | [`polyline_length`] | Total length of a track in meters |
//! | [`bearing_offset`] | Point at a distance and bearing from an origin |
//!
//! ## Example
//!
//! ```rust
//! use walk_planner::{GeoPoint, geo_utils};
//!
//! let start = GeoPoint::new(37.5665, 126.9780);
//! let north = geo_utils::bearing_offset(&start, 500.0, 0.0);
//!
//! let d = geo_utils::haversine_distance(&start, &north);
//! assert!((d - 500.0).abs() < 5.0);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances use a spherical Earth of radius 6,371,000 m. At the city scale
//! this crate works at (hundreds of meters to a few kilometers) the error
//! against an ellipsoid is well below GPS noise.
//!
//! ### Equirectangular Offsets
//!
//! [`bearing_offset`] treats one degree of latitude as 111,320 m and scales
//! longitude by `cos(lat)`. It is only used to place fallback waypoints, where
//! a few percent of error does not matter.

use crate::GeoPoint;

/// Earth radius used by all distance computations, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude for the equirectangular approximation.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two points using the Haversine formula.
///
/// Symmetric, and zero for identical points.
///
/// # Example
///
/// ```rust
/// use walk_planner::{GeoPoint, geo_utils};
///
/// let city_hall = GeoPoint::new(37.5665, 126.9780);
/// let gangnam = GeoPoint::new(37.4979, 127.0276);
///
/// let distance = geo_utils::haversine_distance(&city_hall, &gangnam);
/// assert!((distance - 8_800.0).abs() < 300.0);
/// ```
#[inline]
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let sin_d_lat = (d_lat / 2.0).sin();
    let sin_d_lng = (d_lng / 2.0).sin();
    let h = sin_d_lat * sin_d_lat + lat1.cos() * lat2.cos() * sin_d_lng * sin_d_lng;

    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Calculate the total length of a polyline in meters.
///
/// Sums the haversine distance between consecutive points. Empty or single-point
/// tracks return 0.0.
pub fn polyline_length(points: &[GeoPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Projection
// =============================================================================

/// Project a point `radius_m` meters from `origin` along a compass bearing.
///
/// `degrees` is measured clockwise from north: 0° moves north, 90° east.
/// Uses the equirectangular approximation (see module docs).
pub fn bearing_offset(origin: &GeoPoint, radius_m: f64, degrees: f64) -> GeoPoint {
    let rad = degrees.to_radians();
    let d_lat = radius_m * rad.cos() / METERS_PER_DEGREE;
    let d_lng = radius_m * rad.sin() / (METERS_PER_DEGREE * origin.lat.to_radians().cos());
    GeoPoint::new(origin.lat + d_lat, origin.lng + d_lng)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GeoPoint::new(37.5665, 126.9780);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_distance_symmetric() {
        let a = GeoPoint::new(37.5665, 126.9780);
        let b = GeoPoint::new(35.1796, 129.0756);
        assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
    }

    #[test]
    fn test_haversine_distance_known_value() {
        // London to Paris is approximately 344 km
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let dist = haversine_distance(&london, &paris);
        assert!(approx_eq(dist, 343_560.0, 5000.0));
    }

    #[test]
    fn test_one_degree_latitude() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(1.0, 0.0);
        let expected = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        assert!(approx_eq(haversine_distance(&a, &b), expected, 1e-6));
    }

    #[test]
    fn test_radius_is_not_geo_mean_radius() {
        use geo::{Distance, Haversine, Point};

        // geo's Haversine uses 6 371 008.8 m, about 1.4 m longer over 1000 km
        let a = GeoPoint::new(37.0, 127.0);
        let b = GeoPoint::new(46.0, 127.0);
        let ours = haversine_distance(&a, &b);
        let geo = Haversine::distance(Point::new(a.lng, a.lat), Point::new(b.lng, b.lat));
        assert!(approx_eq(ours / geo, EARTH_RADIUS_M / 6_371_008.8, 1e-9));
        assert!(geo - ours > 1.0);
    }

    #[test]
    fn test_polyline_length_short_inputs() {
        assert_eq!(polyline_length(&[]), 0.0);
        assert_eq!(polyline_length(&[GeoPoint::new(37.5, 127.0)]), 0.0);
    }

    #[test]
    fn test_polyline_length_sums_segments() {
        let a = GeoPoint::new(37.5000, 127.0000);
        let b = GeoPoint::new(37.5010, 127.0000);
        let c = GeoPoint::new(37.5010, 127.0010);
        let total = polyline_length(&[a, b, c]);
        let expected = haversine_distance(&a, &b) + haversine_distance(&b, &c);
        assert!(approx_eq(total, expected, 1e-9));
    }

    #[test]
    fn test_bearing_offset_axes() {
        let origin = GeoPoint::new(37.5665, 126.9780);

        let north = bearing_offset(&origin, 1000.0, 0.0);
        assert!(approx_eq(north.lng, origin.lng, 1e-12));
        assert!(approx_eq(north.lat - origin.lat, 1000.0 / METERS_PER_DEGREE, 1e-12));

        let east = bearing_offset(&origin, 1000.0, 90.0);
        assert!(approx_eq(east.lat, origin.lat, 1e-9));
        assert!(east.lng > origin.lng);

        // Coarse but within a couple of percent at this scale
        for deg in [0.0, 45.0, 90.0, 180.0, 270.0] {
            let p = bearing_offset(&origin, 1000.0, deg);
            assert!(approx_eq(haversine_distance(&origin, &p), 1000.0, 20.0));
        }
    }
}
