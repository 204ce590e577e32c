//! Territory aggregation over GeoJSON region datasets.

use chrono::Utc;
use walk_planner::{
    IntensityTier, MatchConfig, PlaceMatcher, RegionSet, VisitCandidate, VisitRecord,
};

const REGIONS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {"adm_cd": "A", "name": "Square"},
      "geometry": {"type": "Polygon", "coordinates": [
        [[127.00, 37.50], [127.02, 37.50], [127.02, 37.52], [127.00, 37.52], [127.00, 37.50]]
      ]}
    },
    {
      "type": "Feature",
      "properties": {"code": "B"},
      "geometry": {"type": "Polygon", "coordinates": [
        [[127.10, 37.50], [127.14, 37.50], [127.14, 37.54], [127.10, 37.54], [127.10, 37.50]],
        [[127.11, 37.51], [127.13, 37.51], [127.13, 37.53], [127.11, 37.53], [127.11, 37.51]]
      ]}
    },
    {
      "type": "Feature",
      "properties": {"sig_cd": "C"},
      "geometry": {"type": "MultiPolygon", "coordinates": [
        [[[127.20, 37.50], [127.21, 37.50], [127.21, 37.51], [127.20, 37.51], [127.20, 37.50]]],
        [[[127.30, 37.50], [127.31, 37.50], [127.31, 37.51], [127.30, 37.51], [127.30, 37.50]]]
      ]}
    },
    {
      "type": "Feature",
      "properties": {"name": "Empty"},
      "geometry": {"type": "Polygon", "coordinates": [
        [[128.00, 36.00], [128.01, 36.00], [128.01, 36.01], [128.00, 36.00]]
      ]}
    },
    {
      "type": "Feature",
      "properties": {"name": "Line"},
      "geometry": {"type": "LineString", "coordinates": [[127.0, 37.5], [127.3, 37.5]]}
    }
  ]
}"#;

fn visit(lat: f64, lng: f64, count: u32) -> VisitRecord {
    let matcher = PlaceMatcher::new(MatchConfig::default());
    let mut record = matcher.create_visit(
        &VisitCandidate {
            lat,
            lng,
            place_name: format!("place {} {}", lat, lng),
            note: String::new(),
            visited_at: Utc::now(),
            place_id: None,
        },
        Utc::now(),
    );
    record.visit_dates = vec![Utc::now(); count as usize];
    record.visit_count = count;
    record
}

#[test]
fn test_single_visit_single_region() {
    let set = RegionSet::from_geojson_str(REGIONS).unwrap();
    let counts = set.aggregate(&[visit(37.51, 127.01, 3)]);

    assert_eq!(counts.len(), 1);
    assert_eq!(counts.get("A"), Some(&3));
    assert!(!counts.contains_key("Empty"));
}

#[test]
fn test_holes_and_multipolygons() {
    let set = RegionSet::from_geojson_str(REGIONS).unwrap();
    assert_eq!(set.len(), 5);
    assert_eq!(set.skipped, 0);

    let visits = vec![
        // Inside B's hole: not in B
        visit(37.52, 127.12, 4),
        // Inside B's outer ring, outside the hole
        visit(37.505, 127.105, 2),
        // Both parts of C
        visit(37.505, 127.205, 1),
        visit(37.505, 127.305, 5),
        // Nowhere
        visit(35.0, 129.0, 9),
    ];
    let counts = set.aggregate(&visits);

    assert_eq!(counts.get("B"), Some(&2));
    assert_eq!(counts.get("C"), Some(&6));
    assert!(!counts.contains_key("A"));
    assert!(!counts.contains_key("Line"));
    assert_eq!(counts.len(), 2);

    assert_eq!(IntensityTier::for_count(counts["C"]), IntensityTier::Medium);
}

#[test]
fn test_shared_ids_accumulate() {
    let doc = r#"{
      "type": "FeatureCollection",
      "features": [
        {"properties": {"name": "Twin"}, "geometry": {"type": "Polygon", "coordinates": [
          [[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]}},
        {"properties": {"name": "Twin"}, "geometry": {"type": "Polygon", "coordinates": [
          [[2, 0], [3, 0], [3, 1], [2, 1], [2, 0]]]}}
      ]
    }"#;
    let set = RegionSet::from_geojson_str(doc).unwrap();
    let counts = set.aggregate(&[visit(0.5, 0.5, 1), visit(0.5, 2.5, 2)]);
    assert_eq!(counts.get("Twin"), Some(&3));
}

#[test]
fn test_no_visits_no_counts() {
    let set = RegionSet::from_geojson_str(REGIONS).unwrap();
    assert!(set.aggregate(&[]).is_empty());
}
