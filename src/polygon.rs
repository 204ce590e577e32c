//! Typed region geometry and point-in-polygon tests.
//!
//! Region boundaries arrive as GeoJSON-like `Polygon` / `MultiPolygon`
//! geometries. They are validated once, at load time, into [`Ring`]s that carry
//! a precomputed bounding box, so the hot containment loop in
//! [`crate::territory`] never touches untyped JSON.
//!
//! Containment is an even-odd ray cast. Each polygon's outer ring is tested
//! against its bounding box first; a point inside any hole ring is outside the
//! polygon. Coordinates follow GeoJSON order: `x = lng`, `y = lat`.

use geo::{BoundingRect, Coord, LineString, Rect};
use serde_json::Value;

use crate::{GeoPoint, OptionExt, Result, WalkError};

/// A closed ring of `[lng, lat]` positions with its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    line: LineString<f64>,
    bbox: Rect<f64>,
}

impl Ring {
    /// Build a ring from `(lng, lat)` pairs. At least 3 finite positions are required.
    pub fn new(positions: Vec<(f64, f64)>) -> Result<Self> {
        if positions.len() < 3 {
            return Err(WalkError::InvalidRegion {
                message: format!("ring has {} positions, minimum 3 required", positions.len()),
            });
        }
        if positions.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(WalkError::InvalidRegion {
                message: "ring has non-finite coordinates".to_string(),
            });
        }

        let line: LineString<f64> = positions.into_iter().map(|(x, y)| Coord { x, y }).collect();
        let bbox = line
            .bounding_rect()
            .ok_or_invalid_region("ring has no bounding box")?;
        Ok(Self { line, bbox })
    }

    fn from_json(value: &Value) -> Result<Self> {
        let positions = value
            .as_array()
            .ok_or_invalid_region("ring is not an array")?
            .iter()
            .map(|pos| {
                let pair = pos.as_array().ok_or_invalid_region("position is not an array")?;
                let x = pair.first().and_then(Value::as_f64);
                let y = pair.get(1).and_then(Value::as_f64);
                match (x, y) {
                    (Some(x), Some(y)) => Ok((x, y)),
                    _ => Err(WalkError::InvalidRegion {
                        message: "position is not a numeric [lng, lat] pair".to_string(),
                    }),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(positions)
    }

    /// Inclusive bounding-box test.
    #[inline]
    pub fn bbox_contains(&self, x: f64, y: f64) -> bool {
        let min = self.bbox.min();
        let max = self.bbox.max();
        x >= min.x && x <= max.x && y >= min.y && y <= max.y
    }

    /// Even-odd ray cast. Points exactly on an edge may fall either way.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let coords = &self.line.0;
        let mut inside = false;
        let mut j = coords.len() - 1;

        for i in 0..coords.len() {
            let (xi, yi) = (coords[i].x, coords[i].y);
            let (xj, yj) = (coords[j].x, coords[j].y);

            // (yi > y) != (yj > y) guarantees yj != yi, so the division is safe
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }

        inside
    }
}

/// One outer ring minus zero or more hole rings.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub outer: Ring,
    pub holes: Vec<Ring>,
}

impl Polygon {
    pub fn new(outer: Ring, holes: Vec<Ring>) -> Self {
        Self { outer, holes }
    }

    fn from_json(value: &Value) -> Result<Self> {
        let rings = value
            .as_array()
            .ok_or_invalid_region("polygon is not an array of rings")?;
        let (outer, holes) = rings
            .split_first()
            .ok_or_invalid_region("polygon has no rings")?;

        Ok(Self {
            outer: Ring::from_json(outer)?,
            holes: holes.iter().map(Ring::from_json).collect::<Result<Vec<_>>>()?,
        })
    }

    /// Inside the outer ring and outside every hole.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if !self.outer.bbox_contains(x, y) || !self.outer.contains(x, y) {
            return false;
        }
        !self.holes.iter().any(|hole| hole.contains(x, y))
    }
}

/// Geometry of a region feature.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionGeometry {
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
    /// Any other geometry type. Never contains a point.
    Unsupported(String),
}

impl RegionGeometry {
    /// Parse a GeoJSON geometry object.
    ///
    /// Unknown geometry types become [`RegionGeometry::Unsupported`]; malformed
    /// polygon coordinates are an error.
    pub fn from_geojson(geometry: &Value) -> Result<Self> {
        let kind = geometry
            .get("type")
            .and_then(Value::as_str)
            .ok_or_invalid_region("geometry has no type")?;
        let coordinates = geometry.get("coordinates");

        match kind {
            "Polygon" => {
                let coords = coordinates.ok_or_invalid_region("polygon has no coordinates")?;
                Ok(RegionGeometry::Polygon(Polygon::from_json(coords)?))
            }
            "MultiPolygon" => {
                let parts = coordinates
                    .and_then(Value::as_array)
                    .ok_or_invalid_region("multipolygon has no coordinate array")?;
                let polygons = parts
                    .iter()
                    .map(Polygon::from_json)
                    .collect::<Result<Vec<_>>>()?;
                Ok(RegionGeometry::MultiPolygon(polygons))
            }
            other => Ok(RegionGeometry::Unsupported(other.to_string())),
        }
    }

    /// Point-in-polygon test for a visit location.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let (x, y) = (point.lng, point.lat);
        match self {
            RegionGeometry::Polygon(polygon) => polygon.contains(x, y),
            RegionGeometry::MultiPolygon(parts) => parts.iter().any(|p| p.contains(x, y)),
            RegionGeometry::Unsupported(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(min: f64, max: f64) -> Ring {
        Ring::new(vec![(min, min), (max, min), (max, max), (min, max), (min, min)]).unwrap()
    }

    #[test]
    fn test_ring_contains() {
        let ring = square(0.0, 10.0);
        assert!(ring.contains(5.0, 5.0));
        assert!(!ring.contains(15.0, 5.0));
        assert!(!ring.contains(-1.0, 5.0));
    }

    #[test]
    fn test_ring_rejects_degenerate_input() {
        assert!(Ring::new(vec![(0.0, 0.0), (1.0, 1.0)]).is_err());
        assert!(Ring::new(vec![(0.0, 0.0), (1.0, f64::NAN), (1.0, 0.0)]).is_err());
    }

    #[test]
    fn test_polygon_with_hole() {
        let polygon = Polygon::new(square(0.0, 10.0), vec![square(4.0, 6.0)]);
        assert!(polygon.contains(2.0, 2.0));
        assert!(!polygon.contains(5.0, 5.0));
        assert!(!polygon.contains(11.0, 5.0));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening upward
        let ring = Ring::new(vec![
            (0.0, 0.0),
            (3.0, 0.0),
            (3.0, 3.0),
            (2.0, 3.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 3.0),
            (0.0, 3.0),
        ])
        .unwrap();
        assert!(ring.contains(0.5, 2.0));
        assert!(ring.contains(2.5, 2.0));
        // Inside the bbox but in the notch
        assert!(ring.bbox_contains(1.5, 2.0));
        assert!(!ring.contains(1.5, 2.0));
    }

    #[test]
    fn test_multipolygon_part_holes() {
        let geometry = RegionGeometry::MultiPolygon(vec![
            Polygon::new(square(0.0, 10.0), vec![square(4.0, 6.0)]),
            Polygon::new(square(20.0, 30.0), vec![]),
        ]);
        assert!(geometry.contains(&GeoPoint::new(2.0, 2.0)));
        assert!(geometry.contains(&GeoPoint::new(25.0, 25.0)));
        assert!(!geometry.contains(&GeoPoint::new(5.0, 5.0)));
        assert!(!geometry.contains(&GeoPoint::new(15.0, 15.0)));
    }

    #[test]
    fn test_from_geojson() {
        let polygon = RegionGeometry::from_geojson(&json!({
            "type": "Polygon",
            "coordinates": [
                [[126.9, 37.5], [127.1, 37.5], [127.1, 37.7], [126.9, 37.7], [126.9, 37.5]]
            ]
        }))
        .unwrap();
        // lat 37.6, lng 127.0
        assert!(polygon.contains(&GeoPoint::new(37.6, 127.0)));
        // Swapped axes must not match
        assert!(!polygon.contains(&GeoPoint::new(127.0, 37.6)));

        let point = RegionGeometry::from_geojson(&json!({
            "type": "Point",
            "coordinates": [127.0, 37.6]
        }))
        .unwrap();
        assert_eq!(point, RegionGeometry::Unsupported("Point".to_string()));
        assert!(!point.contains(&GeoPoint::new(37.6, 127.0)));
    }

    #[test]
    fn test_from_geojson_malformed() {
        assert!(RegionGeometry::from_geojson(&json!({"coordinates": []})).is_err());
        assert!(RegionGeometry::from_geojson(&json!({"type": "Polygon"})).is_err());
        assert!(RegionGeometry::from_geojson(&json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], ["a", 1.0], [1.0, 1.0]]]
        }))
        .is_err());
        assert!(RegionGeometry::from_geojson(&json!({
            "type": "MultiPolygon",
            "coordinates": [[]]
        }))
        .is_err());
    }
}
