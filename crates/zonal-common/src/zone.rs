//! Vector zones (polygons) that raster values are aggregated onto.

use std::fmt;

use geo::Geometry;
use serde::{Deserialize, Serialize};

/// Identifier of a zone, taken from an attribute of the boundary dataset.
///
/// Ordering puts integer ids before text ids so that mixed sets still sort
/// deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ZoneId {
    Integer(i64),
    Text(String),
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneId::Integer(v) => write!(f, "{v}"),
            ZoneId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        ZoneId::Text(s.to_string())
    }
}

impl From<String> for ZoneId {
    fn from(s: String) -> Self {
        ZoneId::Text(s)
    }
}

impl From<i64> for ZoneId {
    fn from(v: i64) -> Self {
        ZoneId::Integer(v)
    }
}

/// A zone: identifier plus geometry.
///
/// Zones are held as an ordered `Vec<Zone>`; that order is preserved by the
/// mapping, the reducer output and the per-period records.
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: ZoneId,
    pub geometry: Geometry<f64>,
}

impl Zone {
    pub fn new(id: impl Into<ZoneId>, geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id: id.into(),
            geometry: geometry.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, Geometry};

    #[test]
    fn test_zone_id_ordering_and_display() {
        let mut ids = vec![
            ZoneId::from("06037"),
            ZoneId::from(7_i64),
            ZoneId::from("01001"),
        ];
        ids.sort();
        assert_eq!(ids[0], ZoneId::Integer(7));
        assert_eq!(ids[1].to_string(), "01001");
        assert_eq!(ids[2].to_string(), "06037");
    }

    #[test]
    fn test_zone_from_point() {
        let zone = Zone::new("a", point!(x: 1.0, y: 2.0));
        assert!(matches!(zone.geometry, Geometry::Point(_)));
    }
}
