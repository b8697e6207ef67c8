//! River network features as delivered by the hydrology service
//!
//! The network arrives as a GeoJSON FeatureCollection of LineStrings in flow order. Only each
//! feature's geometry is used; properties are ignored.

use crate::{Result, SnapError};
use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, Geometry, Value};

/// Geographic line strings, one per feature, in feature order
///
/// Fails with `InvalidGeometry` on an empty collection, a feature without geometry, a geometry
/// other than LineString or malformed positions.
pub fn lines_from_features(collection: &FeatureCollection) -> Result<Vec<LineString<f64>>> {
    if collection.features.is_empty() {
        return Err(SnapError::InvalidGeometry(
            "Feature collection has no features".to_string(),
        ));
    }
    collection
        .features
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            let Some(geometry) = &feature.geometry else {
                return Err(SnapError::InvalidGeometry(format!(
                    "Feature {i} has no geometry"
                )));
            };
            match &geometry.value {
                Value::LineString(positions) => line_from_positions(positions)
                    .map_err(|e| SnapError::InvalidGeometry(format!("Feature {i}: {e}"))),
                other => Err(SnapError::InvalidGeometry(format!(
                    "Feature {i} is a {}, expected LineString",
                    geometry_kind(other)
                ))),
            }
        })
        .collect()
}

/// FeatureCollection with one LineString feature per line and no properties
pub fn features_from_lines(lines: &[LineString<f64>]) -> FeatureCollection {
    let features = lines
        .iter()
        .map(|line| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(
                line.0.iter().map(|c| vec![c.x, c.y]).collect(),
            ))),
            id: None,
            properties: None,
            foreign_members: None,
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Build a line string from raw positions
///
/// Every position needs 2 or 3 components and all positions must have the same count. A third
/// component (elevation) is dropped.
pub fn line_from_positions(positions: &[Vec<f64>]) -> Result<LineString<f64>> {
    if positions.len() < 2 {
        return Err(SnapError::InvalidGeometry(format!(
            "Line needs at least 2 positions, got {}",
            positions.len()
        )));
    }

    let dims = positions[0].len();
    if !(2..=3).contains(&dims) {
        return Err(SnapError::InvalidGeometry(format!(
            "Positions need 2 or 3 components, got {dims}"
        )));
    }

    positions
        .iter()
        .enumerate()
        .map(|(i, position)| {
            if position.len() != dims {
                return Err(SnapError::InvalidGeometry(format!(
                    "Position {i} has {} components, expected {dims}",
                    position.len()
                )));
            }
            Ok(Coord {
                x: position[0],
                y: position[1],
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn geometry_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}
