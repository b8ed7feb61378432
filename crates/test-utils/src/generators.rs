//! Synthetic layers and zones with predictable values.

use geo::polygon;
use zonal_common::{GridDescriptor, Nodata, RasterLayer, Zone};

/// Row-major values where each cell is `col * 1000 + row`.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Layer whose cell values are produced by `f(row, col)`.
pub fn layer_from_fn(
    grid: GridDescriptor,
    provenance: &str,
    f: impl Fn(usize, usize) -> f32,
) -> RasterLayer {
    let mut data = Vec::with_capacity(grid.len());
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            data.push(f(row, col));
        }
    }
    RasterLayer::new(grid, data, Nodata::nan(), provenance).expect("generated layer matches grid")
}

/// Layer with `col * 1000 + row` values.
pub fn create_test_layer(grid: GridDescriptor, provenance: &str) -> RasterLayer {
    layer_from_fn(grid, provenance, |row, col| (col * 1000 + row) as f32)
}

/// Copy of `layer` with every cell where `invalid(row, col)` set to NaN.
pub fn with_nodata(layer: &RasterLayer, invalid: impl Fn(usize, usize) -> bool) -> RasterLayer {
    let mut out = layer.clone();
    let cols = layer.grid.cols;
    for (i, v) in out.data.iter_mut().enumerate() {
        if invalid(i / cols, i % cols) {
            *v = f32::NAN;
        }
    }
    out
}

/// Tile a grid with square zones of `block` cells per side, ids `"r{row}c{col}"`.
///
/// Zone edges coincide with cell edges. Trailing partial blocks are skipped.
pub fn block_zones(grid: &GridDescriptor, block: usize) -> Vec<Zone> {
    let width = block as f64 * grid.pixel_width;
    let height = block as f64 * grid.pixel_height;
    let mut zones = Vec::new();
    for br in 0..grid.rows / block {
        for bc in 0..grid.cols / block {
            let min_x = grid.origin_x + bc as f64 * width;
            let max_y = grid.origin_y - br as f64 * height;
            let zone = polygon![
                (x: min_x, y: max_y - height),
                (x: min_x + width, y: max_y - height),
                (x: min_x + width, y: max_y),
                (x: min_x, y: max_y)
            ];
            zones.push(Zone::new(format!("r{br}c{bc}"), zone));
        }
    }
    zones
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridDescriptor {
        GridDescriptor::new(-10.0, 10.0, 0.5, 0.5, 8, 6).unwrap()
    }

    #[test]
    fn test_create_test_layer() {
        let layer = create_test_layer(grid(), "gen");
        assert_eq!(layer.data.len(), 48);
        assert_eq!(layer.get(2, 3), Some(3002.0));
    }

    #[test]
    fn test_with_nodata() {
        let layer = create_test_layer(grid(), "gen");
        let masked = with_nodata(&layer, |row, _| row == 0);
        assert_eq!(masked.valid_count(), 42);
    }

    #[test]
    fn test_block_zones_cover_grid() {
        let zones = block_zones(&grid(), 2);
        assert_eq!(zones.len(), 12);
        assert_eq!(zones[0].id.to_string(), "r0c0");
    }
}
