//! # Territory Aggregation
//!
//! Turns the visit collection into per-region visit intensity: every region
//! feature gets the sum of `visit_count` over the visits whose location falls
//! inside it. The result is display data, recomputed on demand and never
//! persisted.
//!
//! ## Region identifiers
//!
//! Administrative datasets disagree on which property names a region. The
//! first present of `adm_cd`, `code`, `sig_cd`, `name` is used, falling back
//! to the feature's position in the collection.

use std::collections::HashMap;

use log::{debug, warn};
use serde_json::Value;

use crate::polygon::RegionGeometry;
use crate::{GeoPoint, OptionExt, Result, VisitRecord, WalkError};

/// Property names tried, in order, to identify a region.
pub const REGION_ID_KEYS: [&str; 4] = ["adm_cd", "code", "sig_cd", "name"];

/// One administrative boundary used as an aggregation bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFeature {
    pub id: String,
    pub geometry: RegionGeometry,
}

impl RegionFeature {
    pub fn new(id: impl Into<String>, geometry: RegionGeometry) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }

    /// Whether the visit location lies inside this region.
    #[inline]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.geometry.contains(point)
    }
}

/// A validated region dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSet {
    pub features: Vec<RegionFeature>,
    /// Features dropped at load time because their geometry was malformed.
    pub skipped: usize,
}

impl RegionSet {
    /// Parse a GeoJSON FeatureCollection.
    ///
    /// Features with malformed polygon geometry are skipped (and counted in
    /// [`RegionSet::skipped`]); a document that is not a FeatureCollection at
    /// all is an error.
    pub fn from_geojson_str(json: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(json).map_err(|e| WalkError::InvalidRegion {
            message: format!("region dataset is not valid JSON: {}", e),
        })?;
        Self::from_geojson(&doc)
    }

    /// Build from an already parsed FeatureCollection value.
    pub fn from_geojson(doc: &Value) -> Result<Self> {
        let features = doc
            .get("features")
            .and_then(Value::as_array)
            .ok_or_invalid_region("document has no features array")?;

        let mut set = RegionSet::default();
        for (idx, feature) in features.iter().enumerate() {
            let id = feature_id(feature, idx);
            let geometry = match feature.get("geometry") {
                Some(g) if !g.is_null() => RegionGeometry::from_geojson(g),
                _ => Err(WalkError::InvalidRegion {
                    message: "feature has no geometry".to_string(),
                }),
            };

            match geometry {
                Ok(geometry) => set.features.push(RegionFeature::new(id, geometry)),
                Err(e) => {
                    warn!("[Territory] Skipping region {} (#{}): {}", id, idx, e);
                    set.skipped += 1;
                }
            }
        }

        debug!(
            "[Territory] Loaded {} regions ({} skipped)",
            set.features.len(),
            set.skipped
        );
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Visit counts per region id. See [`aggregate_visit_counts`].
    pub fn aggregate(&self, visits: &[VisitRecord]) -> HashMap<String, u32> {
        aggregate_visit_counts(&self.features, visits)
    }
}

/// Resolve a feature's identifier from its properties, else its index.
pub fn feature_id(feature: &Value, index: usize) -> String {
    let props = feature.get("properties");
    REGION_ID_KEYS
        .iter()
        .filter_map(|key| props.and_then(|p| p.get(*key)))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| index.to_string())
}

/// Sum visit counts into the regions containing each visit.
///
/// Regions with no contained visits are absent from the map rather than
/// present with zero. Regions sharing an id accumulate into one entry.
pub fn aggregate_visit_counts(
    features: &[RegionFeature],
    visits: &[VisitRecord],
) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    if visits.is_empty() {
        return counts;
    }

    for feature in features {
        let total: u32 = visits
            .iter()
            .filter(|v| feature.contains(&GeoPoint::new(v.lat, v.lng)))
            .map(|v| v.visit_count)
            .sum();

        if total > 0 {
            *counts.entry(feature.id.clone()).or_insert(0) += total;
        }
    }

    counts
}

/// Display intensity for a region's visit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntensityTier {
    None,
    Light,
    Low,
    Medium,
    High,
    Peak,
}

impl IntensityTier {
    pub fn for_count(count: u32) -> Self {
        match count {
            20.. => IntensityTier::Peak,
            10..=19 => IntensityTier::High,
            5..=9 => IntensityTier::Medium,
            2..=4 => IntensityTier::Low,
            1 => IntensityTier::Light,
            0 => IntensityTier::None,
        }
    }

    /// Fill color, from near-white to deep purple.
    pub fn color(self) -> &'static str {
        match self {
            IntensityTier::None => "#f7f2f8",
            IntensityTier::Light => "#e1bee7",
            IntensityTier::Low => "#ba68c8",
            IntensityTier::Medium => "#8e24aa",
            IntensityTier::High => "#6a1b9a",
            IntensityTier::Peak => "#3b0a45",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feature_id_preference() {
        let f = json!({"properties": {"name": "Jongno", "code": "11010", "adm_cd": "1101"}});
        assert_eq!(feature_id(&f, 7), "1101");

        let f = json!({"properties": {"name": "Jongno", "sig_cd": "11110"}});
        assert_eq!(feature_id(&f, 7), "11110");

        let f = json!({"properties": {"code": 11010}});
        assert_eq!(feature_id(&f, 7), "11010");

        let f = json!({"properties": {"adm_cd": "", "name": "Jung"}});
        assert_eq!(feature_id(&f, 7), "Jung");

        let f = json!({"properties": {}});
        assert_eq!(feature_id(&f, 7), "7");
        assert_eq!(feature_id(&json!({}), 3), "3");
    }

    #[test]
    fn test_intensity_tiers() {
        assert_eq!(IntensityTier::for_count(0), IntensityTier::None);
        assert_eq!(IntensityTier::for_count(1), IntensityTier::Light);
        assert_eq!(IntensityTier::for_count(4), IntensityTier::Low);
        assert_eq!(IntensityTier::for_count(5), IntensityTier::Medium);
        assert_eq!(IntensityTier::for_count(19), IntensityTier::High);
        assert_eq!(IntensityTier::for_count(250), IntensityTier::Peak);
        assert_eq!(IntensityTier::Peak.color(), "#3b0a45");
        assert!(IntensityTier::High > IntensityTier::Low);
    }

    #[test]
    fn test_skips_malformed_features() {
        let set = RegionSet::from_geojson(&json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "properties": {"code": "ok"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}
                },
                {
                    "properties": {"code": "bad"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0]]]}
                },
                {"properties": {"code": "none"}, "geometry": null}
            ]
        }))
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.skipped, 2);
        assert_eq!(set.features[0].id, "ok");
    }

    #[test]
    fn test_rejects_non_collection() {
        assert!(RegionSet::from_geojson_str("[1, 2, 3]").is_err());
        assert!(RegionSet::from_geojson_str("{").is_err());
    }
}
