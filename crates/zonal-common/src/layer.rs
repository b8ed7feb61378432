//! Raster layers aligned to a grid descriptor.

use serde::{Deserialize, Serialize};

use crate::error::{ZonalError, ZonalResult};
use crate::grid::{GridDescriptor, RowOrder};

/// Definition of which cell values hold no valid measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nodata {
    /// Sentinel value marking an invalid cell
    #[serde(default)]
    pub sentinel: Option<f32>,
    /// Treat NaN as invalid
    #[serde(default = "default_true")]
    pub nan_is_invalid: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Nodata {
    fn default() -> Self {
        Self::nan()
    }
}

impl Nodata {
    /// NaN is the only invalid marker.
    pub fn nan() -> Self {
        Self {
            sentinel: None,
            nan_is_invalid: true,
        }
    }

    /// A sentinel value, with NaN also treated as invalid.
    pub fn sentinel(value: f32) -> Self {
        Self {
            sentinel: Some(value),
            nan_is_invalid: true,
        }
    }

    /// Check whether a cell value is invalid under this definition.
    pub fn is_invalid(&self, value: f32) -> bool {
        if value.is_nan() {
            // A NaN sentinel can only be matched this way.
            return self.nan_is_invalid || self.sentinel.is_some_and(|s| s.is_nan());
        }
        self.sentinel == Some(value)
    }
}

/// One time period of one variable, stored row-major and north-up.
#[derive(Debug, Clone)]
pub struct RasterLayer {
    /// Grid the data is aligned to
    pub grid: GridDescriptor,
    /// Cell values, row 0 = northernmost row
    pub data: Vec<f32>,
    /// Invalid-cell definition
    pub nodata: Nodata,
    /// Where the layer came from (file path or other provenance string)
    pub provenance: String,
}

impl RasterLayer {
    /// Create a north-up layer, validating its size against the grid.
    pub fn new(
        grid: GridDescriptor,
        data: Vec<f32>,
        nodata: Nodata,
        provenance: impl Into<String>,
    ) -> ZonalResult<Self> {
        if data.len() != grid.len() {
            return Err(ZonalError::configuration(format!(
                "layer has {} values but grid is {}x{}",
                data.len(),
                grid.rows,
                grid.cols
            )));
        }

        Ok(Self {
            grid,
            data,
            nodata,
            provenance: provenance.into(),
        })
    }

    /// Create a layer from data in the given storage order, flipping rows
    /// when the source is south-up.
    pub fn from_rows(
        grid: GridDescriptor,
        mut data: Vec<f32>,
        order: RowOrder,
        nodata: Nodata,
        provenance: impl Into<String>,
    ) -> ZonalResult<Self> {
        if order == RowOrder::SouthUp && data.len() == grid.len() {
            flip_rows(&mut data, grid.cols);
        }
        Self::new(grid, data, nodata, provenance)
    }

    /// Value at a signed cell index; `None` outside the grid.
    pub fn get(&self, row: isize, col: isize) -> Option<f32> {
        if !self.grid.contains_cell(row, col) {
            return None;
        }
        self.data
            .get(self.grid.flat_index(row as usize, col as usize))
            .copied()
    }

    /// Whether a signed cell index is invalid. Out-of-range cells are invalid.
    pub fn is_invalid_at(&self, row: isize, col: isize) -> bool {
        match self.get(row, col) {
            Some(v) => self.nodata.is_invalid(v),
            None => true,
        }
    }

    /// Number of valid cells in the layer.
    pub fn valid_count(&self) -> usize {
        self.data
            .iter()
            .filter(|v| !self.nodata.is_invalid(**v))
            .count()
    }
}

/// Reverse the row order of a row-major buffer in place.
pub fn flip_rows(data: &mut [f32], cols: usize) {
    if cols == 0 {
        return;
    }
    let rows = data.len() / cols;
    for r in 0..rows / 2 {
        let (top, bottom) = data.split_at_mut((rows - 1 - r) * cols);
        top[r * cols..(r + 1) * cols].swap_with_slice(&mut bottom[..cols]);
    }
}
