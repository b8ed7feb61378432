//! Grid descriptors for regular lat/lon rasters.
//!
//! A [`GridDescriptor`] is the affine mapping between raster cell indices and
//! geographic coordinates. Row 0 is the northernmost row; rows increase
//! southward and columns increase eastward.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{ZonalError, ZonalResult};

/// Relative tolerance for the uniform-spacing check on coordinate arrays.
///
/// Coordinate variables are frequently stored as f32, which loses roughly
/// seven significant digits on values like -130.005.
const SPACING_TOLERANCE: f64 = 1e-2;

/// Snap distance used when converting coordinates to fractional indices.
const INDEX_EPSILON: f64 = 1e-9;

/// How the values of a 1-D coordinate array relate to the cells they label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateRegistration {
    /// Coordinate values are cell centres (CF convention).
    #[default]
    CellCenter,
    /// Coordinate values are treated as the outer cell edge. Reproduces the
    /// alignment of pipelines that build the transform straight from the
    /// first coordinate value.
    CellCorner,
}

/// Storage order of rows in the source array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowOrder {
    /// First row is the northernmost one (latitude descending).
    NorthUp,
    /// First row is the southernmost one (latitude ascending); the array
    /// must be flipped vertically to match the descriptor.
    SouthUp,
}

/// Specification of a regular, north-up lat/lon grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDescriptor {
    /// West edge of column 0
    pub origin_x: f64,
    /// North edge of row 0
    pub origin_y: f64,
    /// Cell size along x (always positive)
    pub pixel_width: f64,
    /// Cell size along y (always positive; rows grow southward)
    pub pixel_height: f64,
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
}

impl GridDescriptor {
    /// Create a new grid descriptor from its affine parameters.
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        pixel_width: f64,
        pixel_height: f64,
        rows: usize,
        cols: usize,
    ) -> ZonalResult<Self> {
        if !(pixel_width.is_finite() && pixel_width > 0.0) {
            return Err(ZonalError::configuration(format!(
                "pixel width must be positive, got {pixel_width}"
            )));
        }
        if !(pixel_height.is_finite() && pixel_height > 0.0) {
            return Err(ZonalError::configuration(format!(
                "pixel height must be positive, got {pixel_height}"
            )));
        }
        if !(origin_x.is_finite() && origin_y.is_finite()) {
            return Err(ZonalError::configuration("grid origin must be finite"));
        }

        Ok(Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            rows,
            cols,
        })
    }

    /// Derive a descriptor from 1-D longitude and latitude coordinate arrays.
    ///
    /// Longitude must be strictly ascending; latitude may run either way.
    /// Both axes need at least two values and uniform spacing. The returned
    /// [`RowOrder`] tells the caller whether the data rows must be flipped.
    pub fn from_coordinates(
        lon: &[f64],
        lat: &[f64],
        registration: CoordinateRegistration,
    ) -> ZonalResult<(Self, RowOrder)> {
        let dx = uniform_step("longitude", lon)?;
        let dy = uniform_step("latitude", lat)?;

        if dx < 0.0 {
            return Err(ZonalError::configuration(
                "longitude coordinates must be ascending",
            ));
        }

        let row_order = if dy > 0.0 {
            RowOrder::SouthUp
        } else {
            RowOrder::NorthUp
        };

        let pixel_width = dx.abs();
        let pixel_height = dy.abs();
        let west = lon[0];
        let north = lat[0].max(lat[lat.len() - 1]);

        let (origin_x, origin_y) = match registration {
            CoordinateRegistration::CellCenter => {
                (west - pixel_width / 2.0, north + pixel_height / 2.0)
            }
            CoordinateRegistration::CellCorner => (west, north),
        };

        let grid = Self::new(
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            lat.len(),
            lon.len(),
        )?;
        Ok((grid, row_order))
    }

    /// Geographic extent covered by the grid.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox {
            min_x: self.origin_x,
            min_y: self.origin_y - self.rows as f64 * self.pixel_height,
            max_x: self.origin_x + self.cols as f64 * self.pixel_width,
            max_y: self.origin_y,
        }
    }

    /// Fractional column coordinate of an x value.
    pub fn col_at(&self, x: f64) -> f64 {
        (x - self.origin_x) / self.pixel_width
    }

    /// Fractional row coordinate of a y value.
    pub fn row_at(&self, y: f64) -> f64 {
        (self.origin_y - y) / self.pixel_height
    }

    /// Bounds of a cell. Indices may lie outside the grid.
    pub fn cell_bounds(&self, row: isize, col: isize) -> BoundingBox {
        let min_x = self.origin_x + col as f64 * self.pixel_width;
        let max_y = self.origin_y - row as f64 * self.pixel_height;
        BoundingBox {
            min_x,
            min_y: max_y - self.pixel_height,
            max_x: min_x + self.pixel_width,
            max_y,
        }
    }

    /// Centre coordinate of a cell. Indices may lie outside the grid.
    pub fn cell_center(&self, row: isize, col: isize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Cell (row, col) whose extent contains the point, possibly outside the grid.
    pub fn cell_containing(&self, x: f64, y: f64) -> (isize, isize) {
        (
            snap(self.row_at(y)).floor() as isize,
            snap(self.col_at(x)).floor() as isize,
        )
    }

    /// Whether a signed cell index falls inside the grid.
    pub fn contains_cell(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    /// Minimal index window covering a bounding box.
    ///
    /// The window is not clipped: it may extend past any grid edge.
    pub fn window_for_bbox(&self, bbox: &BoundingBox) -> GridWindow {
        let col_start = snap(self.col_at(bbox.min_x)).floor() as isize;
        let col_stop = snap(self.col_at(bbox.max_x)).ceil() as isize;
        let row_start = snap(self.row_at(bbox.max_y)).floor() as isize;
        let row_stop = snap(self.row_at(bbox.min_y)).ceil() as isize;

        GridWindow {
            row_start,
            col_start,
            rows: (row_stop - row_start).max(0) as usize,
            cols: (col_stop - col_start).max(0) as usize,
        }
    }

    /// Whether two descriptors describe the same cells, within rounding.
    pub fn same_grid(&self, other: &GridDescriptor) -> bool {
        let tol_x = self.pixel_width * 1e-6;
        let tol_y = self.pixel_height * 1e-6;
        self.rows == other.rows
            && self.cols == other.cols
            && (self.origin_x - other.origin_x).abs() <= tol_x
            && (self.origin_y - other.origin_y).abs() <= tol_y
            && (self.pixel_width - other.pixel_width).abs() <= tol_x
            && (self.pixel_height - other.pixel_height).abs() <= tol_y
    }

    /// Row-major flat index of an in-grid cell.
    pub fn flat_index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Check if the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

/// A rectangular block of cell indices, possibly extending beyond the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridWindow {
    pub row_start: isize,
    pub col_start: isize,
    pub rows: usize,
    pub cols: usize,
}

impl GridWindow {
    /// Number of cells in the window.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Translate a window-local cell to full-grid (signed) indices.
    pub fn to_grid(&self, local_row: usize, local_col: usize) -> (isize, isize) {
        (
            self.row_start + local_row as isize,
            self.col_start + local_col as isize,
        )
    }

    /// Whether any cell of the window lies inside the grid.
    pub fn overlaps(&self, grid: &GridDescriptor) -> bool {
        !self.is_empty()
            && self.row_start < grid.rows as isize
            && self.col_start < grid.cols as isize
            && self.row_start + self.rows as isize > 0
            && self.col_start + self.cols as isize > 0
    }
}

/// Full-grid (row, column) index of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellIndex {
    pub row: usize,
    pub col: usize,
}

impl CellIndex {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<(usize, usize)> for CellIndex {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < INDEX_EPSILON {
        r
    } else {
        v
    }
}

/// Mean step of a strictly monotonic, uniformly spaced coordinate array.
fn uniform_step(axis: &str, values: &[f64]) -> ZonalResult<f64> {
    if values.len() < 2 {
        return Err(ZonalError::configuration(format!(
            "{axis} needs at least two coordinate values, got {}",
            values.len()
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ZonalError::configuration(format!(
            "{axis} coordinates contain non-finite values"
        )));
    }

    let step = (values[values.len() - 1] - values[0]) / (values.len() - 1) as f64;
    if step == 0.0 {
        return Err(ZonalError::configuration(format!(
            "{axis} coordinates are not strictly monotonic"
        )));
    }

    for pair in values.windows(2) {
        let d = pair[1] - pair[0];
        if d == 0.0 || d.signum() != step.signum() {
            return Err(ZonalError::configuration(format!(
                "{axis} coordinates are not strictly monotonic"
            )));
        }
        if (d - step).abs() > SPACING_TOLERANCE * step.abs() {
            return Err(ZonalError::configuration(format!(
                "{axis} coordinates are not uniformly spaced (step {d} vs mean {step})"
            )));
        }
    }

    Ok(step)
}
