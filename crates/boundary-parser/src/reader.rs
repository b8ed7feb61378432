//! Shapefile reading.
//!
//! Records are returned in file order. Polygon rings follow the shapefile
//! convention: every outer ring opens a new part and the inner rings that
//! follow it are its holes.

use std::path::Path;

use geo::{coord, Coord, Geometry, LineString, MultiPoint, MultiPolygon, Point, Polygon};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{PolygonRing, Reader, Shape};
use tracing::{info, warn};
use zonal_common::{Zone, ZoneId};

use crate::error::{BoundaryError, BoundaryResult};

/// Read every record of a shapefile as a [`Zone`] keyed by `id_field`.
///
/// Polygon, PolygonM and PolygonZ shapes become (multi)polygons with Z and M
/// dropped; point shapes become points. Null shapes are kept with an empty
/// geometry so record order is preserved; they aggregate to no value.
pub fn read_zones(path: impl AsRef<Path>, id_field: &str) -> BoundaryResult<Vec<Zone>> {
    let path = path.as_ref();
    let mut reader = Reader::from_path(path)?;

    let mut zones = Vec::new();
    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;
        let id = zone_id(&record, id_field, index)?;
        let geometry = shape_to_geometry(shape, index)?;
        zones.push(Zone::new(id, geometry));
    }

    if zones.is_empty() {
        return Err(BoundaryError::NoZones(path.display().to_string()));
    }

    info!(
        path = %path.display(),
        id_field,
        zones = zones.len(),
        "Read boundary zones"
    );
    Ok(zones)
}

/// Identifier of one record.
///
/// Character fields keep their text (trimmed, so zero-padded codes like
/// `"01001"` survive); whole numbers become integer ids.
fn zone_id(record: &Record, field: &str, index: usize) -> BoundaryResult<ZoneId> {
    let value = record.get(field).ok_or_else(|| BoundaryError::MissingField {
        field: field.to_string(),
        record: index,
    })?;

    let missing = || BoundaryError::MissingId {
        record: index,
        field: field.to_string(),
    };

    match value {
        FieldValue::Character(Some(s)) if !s.trim().is_empty() => {
            Ok(ZoneId::Text(s.trim().to_string()))
        }
        FieldValue::Numeric(Some(v)) => Ok(numeric_id(*v)),
        FieldValue::Float(Some(v)) => Ok(numeric_id(*v as f64)),
        FieldValue::Double(v) => Ok(numeric_id(*v)),
        FieldValue::Integer(v) => Ok(ZoneId::Integer(i64::from(*v))),
        _ => Err(missing()),
    }
}

fn numeric_id(v: f64) -> ZoneId {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        ZoneId::Integer(v as i64)
    } else {
        ZoneId::Text(v.to_string())
    }
}

fn shape_to_geometry(shape: Shape, index: usize) -> BoundaryResult<Geometry<f64>> {
    let geometry = match shape {
        Shape::Polygon(polygon) => rings_to_geometry(
            polygon
                .rings()
                .iter()
                .map(|ring| ring_coords(ring, ring.points().iter().map(|p| (p.x, p.y)))),
        ),
        Shape::PolygonM(polygon) => rings_to_geometry(
            polygon
                .rings()
                .iter()
                .map(|ring| ring_coords(ring, ring.points().iter().map(|p| (p.x, p.y)))),
        ),
        Shape::PolygonZ(polygon) => rings_to_geometry(
            polygon
                .rings()
                .iter()
                .map(|ring| ring_coords(ring, ring.points().iter().map(|p| (p.x, p.y)))),
        ),
        Shape::Point(p) => Point::new(p.x, p.y).into(),
        Shape::PointM(p) => Point::new(p.x, p.y).into(),
        Shape::PointZ(p) => Point::new(p.x, p.y).into(),
        Shape::Multipoint(mp) => {
            MultiPoint::from(mp.points().iter().map(|p| (p.x, p.y)).collect::<Vec<_>>()).into()
        }
        Shape::NullShape => {
            warn!(record = index, "Null shape, zone will have no cells");
            MultiPolygon::<f64>::new(Vec::new()).into()
        }
        other => {
            return Err(BoundaryError::UnsupportedShape {
                record: index,
                kind: format!("{:?}", other.shapetype()),
            })
        }
    };
    Ok(geometry)
}

/// Tag a ring's coordinates with whether it is an outer ring.
fn ring_coords<P>(
    ring: &PolygonRing<P>,
    points: impl Iterator<Item = (f64, f64)>,
) -> (bool, Vec<Coord<f64>>) {
    let outer = matches!(ring, PolygonRing::Outer(_));
    (outer, points.map(|(x, y)| coord! { x: x, y: y }).collect())
}

/// Group rings into polygons; a single part comes back as a plain polygon.
fn rings_to_geometry(rings: impl Iterator<Item = (bool, Vec<Coord<f64>>)>) -> Geometry<f64> {
    let mut parts: Vec<Polygon<f64>> = Vec::new();

    for (outer, coords) in rings {
        let ring = LineString::new(coords);
        match parts.last_mut() {
            Some(part) if !outer => part.interiors_push(ring),
            _ => {
                if !outer {
                    warn!("Inner ring before any outer ring, treating it as outer");
                }
                parts.push(Polygon::new(ring, Vec::new()));
            }
        }
    }

    if parts.len() == 1 {
        parts.remove(0).into()
    } else {
        MultiPolygon::new(parts).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Coord<f64>> {
        vec![
            coord! { x: x, y: y },
            coord! { x: x, y: y + size },
            coord! { x: x + size, y: y + size },
            coord! { x: x + size, y: y },
            coord! { x: x, y: y },
        ]
    }

    #[test]
    fn test_rings_grouping() {
        let rings = vec![
            (true, square(0.0, 0.0, 10.0)),
            (false, square(2.0, 2.0, 2.0)),
            (false, square(6.0, 6.0, 2.0)),
            (true, square(20.0, 0.0, 5.0)),
        ];
        match rings_to_geometry(rings.into_iter()) {
            Geometry::MultiPolygon(mp) => {
                assert_eq!(mp.0.len(), 2);
                assert_eq!(mp.0[0].interiors().len(), 2);
                assert!(mp.0[1].interiors().is_empty());
            }
            other => panic!("expected multipolygon, got {other:?}"),
        }
    }

    #[test]
    fn test_single_part_is_polygon() {
        let rings = vec![(true, square(0.0, 0.0, 1.0))];
        assert!(matches!(
            rings_to_geometry(rings.into_iter()),
            Geometry::Polygon(_)
        ));
    }

    #[test]
    fn test_numeric_ids() {
        assert_eq!(numeric_id(6037.0), ZoneId::Integer(6037));
        assert_eq!(numeric_id(1.5), ZoneId::Text("1.5".to_string()));
    }

    #[test]
    fn test_character_id_keeps_leading_zeros() {
        let mut record = Record::default();
        record.insert(
            "GEOID".to_string(),
            FieldValue::Character(Some("01001 ".to_string())),
        );
        assert_eq!(
            zone_id(&record, "GEOID", 0).unwrap(),
            ZoneId::Text("01001".to_string())
        );
        assert!(matches!(
            zone_id(&record, "NAME", 0),
            Err(BoundaryError::MissingField { .. })
        ));
    }

    #[test]
    fn test_empty_id_is_error() {
        let mut record = Record::default();
        record.insert("GEOID".to_string(), FieldValue::Character(None));
        assert!(matches!(
            zone_id(&record, "GEOID", 4),
            Err(BoundaryError::MissingId { record: 4, .. })
        ));
    }
}
