//! Axis-aligned extents.

use serde::{Deserialize, Serialize};

/// Extent in grid coordinates (x = longitude, y = latitude for
/// geographic grids).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// True when `(x, y)` lies strictly inside; points on an edge are out.
    pub fn interior_contains(&self, x: f64, y: f64) -> bool {
        (self.min_x < x && x < self.max_x) && (self.min_y < y && y < self.max_y)
    }
}

impl From<geo::Rect<f64>> for BoundingBox {
    fn from(rect: geo::Rect<f64>) -> Self {
        let (min, max) = (rect.min(), rect.max());
        Self::new(min.x, min.y, max.x, max.y)
    }
}
