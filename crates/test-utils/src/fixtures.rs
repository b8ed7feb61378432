//! Common test fixtures.
//!
//! The reference scenario is a 4x4 grid of 1° cells with its north-west
//! corner at (lon 0, lat 4) and two non-overlapping square zones:
//!
//! ```text
//!          lon 0   1   2   3   4
//!   lat 4  ┌───┬───┬───┬───┐
//!          │ 1 │ 2 │ _ │ _ │   zone "a" = rows 0-1, cols 0-1
//!      3   ├───┼───┼───┼───┤
//!          │ 3 │ 4 │ _ │ _ │
//!      2   ├───┼───┼───┼───┤
//!          │ _ │ _ │ 5 │ 6 │   zone "b" = rows 2-3, cols 2-3
//!      1   ├───┼───┼───┼───┤
//!          │ _ │ _ │ 7 │ 8 │
//!      0   └───┴───┴───┴───┘
//! ```
//!
//! `_` is NaN. Expected means: 2.5 for "a", 6.5 for "b".

use geo::{polygon, Polygon};
use zonal_common::{GridDescriptor, Nodata, RasterLayer, Zone};

/// Expected mean of zone "a" in the scenario layer.
pub const SCENARIO_MEAN_A: f64 = 2.5;

/// Expected mean of zone "b" in the scenario layer.
pub const SCENARIO_MEAN_B: f64 = 6.5;

/// Scenario layer values, row-major, north-up.
pub const SCENARIO_VALUES: [f32; 16] = [
    1.0,
    2.0,
    f32::NAN,
    f32::NAN,
    3.0,
    4.0,
    f32::NAN,
    f32::NAN,
    f32::NAN,
    f32::NAN,
    5.0,
    6.0,
    f32::NAN,
    f32::NAN,
    7.0,
    8.0,
];

/// The 4x4, 1° grid with origin (0, 4).
pub fn scenario_grid() -> GridDescriptor {
    GridDescriptor::new(0.0, 4.0, 1.0, 1.0, 4, 4).expect("valid scenario grid")
}

/// Axis-aligned square polygon from its south-west corner and size.
pub fn square(min_x: f64, min_y: f64, size: f64) -> Polygon<f64> {
    polygon![
        (x: min_x, y: min_y),
        (x: min_x + size, y: min_y),
        (x: min_x + size, y: min_y + size),
        (x: min_x, y: min_y + size)
    ]
}

/// Zones "a" (north-west 2x2 block) and "b" (south-east 2x2 block).
pub fn scenario_zones() -> Vec<Zone> {
    vec![
        Zone::new("a", square(0.0, 2.0, 2.0)),
        Zone::new("b", square(2.0, 0.0, 2.0)),
    ]
}

/// The scenario layer, tagged with `provenance`.
pub fn scenario_layer(provenance: &str) -> RasterLayer {
    RasterLayer::new(
        scenario_grid(),
        SCENARIO_VALUES.to_vec(),
        Nodata::nan(),
        provenance,
    )
    .expect("valid scenario layer")
}

/// Scenario layer with every value shifted by `offset`; same nodata footprint.
pub fn scenario_layer_shifted(provenance: &str, offset: f32) -> RasterLayer {
    let mut layer = scenario_layer(provenance);
    for v in layer.data.iter_mut() {
        *v += offset;
    }
    layer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_shapes() {
        let layer = scenario_layer("x");
        assert_eq!(layer.valid_count(), 8);
        assert_eq!(scenario_zones().len(), 2);
        assert_eq!(layer.get(3, 3), Some(8.0));
    }

    #[test]
    fn test_shift_keeps_nodata() {
        let layer = scenario_layer_shifted("x", 10.0);
        assert_eq!(layer.valid_count(), 8);
        assert_eq!(layer.get(0, 0), Some(11.0));
        assert!(layer.get(0, 2).is_some_and(f32::is_nan));
    }
}
