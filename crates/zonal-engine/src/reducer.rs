//! Per-zone reduction of layer values over a prebuilt mapping.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use zonal_common::{RasterLayer, ZonalError, ZonalResult};

use crate::membership::CellIndexMapping;

/// A reduction of the valid values of one zone to a single number.
///
/// `reduce` is only called with at least one value; zones without valid
/// cells are reported as missing before the reducer is consulted.
pub trait Reducer: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// Reduce a non-empty set of valid values.
    fn reduce(&self, values: &[f64]) -> Option<f64>;
}

/// Built-in statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Arithmetic mean of valid values
    #[default]
    Mean,
    Sum,
    /// Number of valid cells
    Count,
    Min,
    Max,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Count => "count",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Reducer for Statistic {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn reduce(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let value = match self {
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Self::Sum => values.iter().sum(),
            Self::Count => values.len() as f64,
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        };
        Some(value)
    }
}

/// Reduce `layer` over every zone of `mapping`, in mapping order.
///
/// Invalid cells of the layer itself are always skipped, so a mapping built
/// without sample filtering still yields correct per-layer results. Zones
/// with no valid cell produce `None`.
pub fn zonal_reduce(
    mapping: &CellIndexMapping,
    layer: &RasterLayer,
    reducer: &dyn Reducer,
) -> ZonalResult<Vec<Option<f64>>> {
    if !layer.grid.same_grid(mapping.grid()) {
        return Err(ZonalError::configuration(format!(
            "layer '{}' does not share the mapping's grid",
            layer.provenance
        )));
    }

    let grid = mapping.grid();
    let values = mapping
        .entries()
        .par_iter()
        .map(|cells| {
            let valid: Vec<f64> = cells
                .iter()
                .map(|c| layer.data[grid.flat_index(c.row, c.col)])
                .filter(|v| !layer.nodata.is_invalid(*v))
                .map(f64::from)
                .collect();
            if valid.is_empty() {
                None
            } else {
                reducer.reduce(&valid)
            }
        })
        .collect();

    Ok(values)
}
