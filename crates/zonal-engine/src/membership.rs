//! Zone-to-cell membership mapping.
//!
//! The mapping is computed once per (grid, zone set, touch rule, nodata
//! definition) and is read-only afterwards, so it can be shared by every
//! layer of a time series and by parallel reduction workers.
//!
//! Under [`InvalidityPolicy::SampleLayer`] the invalid cells of one sample
//! layer are removed from the mapping. Reusing the mapping for later layers
//! then assumes the nodata footprint does not change over time: a cell that
//! is invalid in the sample but valid later is never counted.

use std::time::Instant;

use geo::BoundingRect;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use zonal_common::{
    BoundingBox, CellIndex, GridDescriptor, RasterLayer, ZonalError, ZonalResult, Zone, ZoneId,
};

use crate::rasterize::{boxify_points, rasterize, TouchRule};

/// Which invalid cells are excluded when the mapping is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidityPolicy {
    /// Exclude cells invalid in the sample layer.
    #[default]
    SampleLayer,
    /// Keep every covered cell; each layer filters its own invalid cells at
    /// reduction time.
    GeometryOnly,
}

/// Per-zone cell sets, in zone order.
#[derive(Debug, Clone, PartialEq)]
pub struct CellIndexMapping {
    grid: GridDescriptor,
    zone_ids: Vec<ZoneId>,
    entries: Vec<Vec<CellIndex>>,
}

impl CellIndexMapping {
    /// Grid the cell indices refer to.
    pub fn grid(&self) -> &GridDescriptor {
        &self.grid
    }

    /// Zone identifiers, in the order the mapping was built.
    pub fn zone_ids(&self) -> &[ZoneId] {
        &self.zone_ids
    }

    /// Cells of the zone at `index`, sorted row-major.
    pub fn cells(&self, index: usize) -> &[CellIndex] {
        &self.entries[index]
    }

    pub fn entries(&self) -> &[Vec<CellIndex>] {
        &self.entries
    }

    /// Number of zones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of zones with no qualifying cell.
    pub fn empty_zone_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_empty()).count()
    }

    /// Total number of (zone, cell) memberships.
    pub fn total_cells(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }
}

/// Builds [`CellIndexMapping`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MembershipMapper {
    pub touch_rule: TouchRule,
    pub invalidity: InvalidityPolicy,
}

impl MembershipMapper {
    pub fn new(touch_rule: TouchRule, invalidity: InvalidityPolicy) -> Self {
        Self {
            touch_rule,
            invalidity,
        }
    }

    /// Compute the mapping of `zones` onto the sample layer's grid.
    ///
    /// Zones are rasterized in parallel; the result keeps the input order.
    pub fn compute(&self, zones: &[Zone], sample: &RasterLayer) -> ZonalResult<CellIndexMapping> {
        let grid = sample.grid;
        if grid.is_empty() {
            return Err(ZonalError::configuration("cannot map zones onto an empty grid"));
        }

        let start = Instant::now();
        let entries = zones
            .par_iter()
            .map(|zone| self.zone_cells(zone, &grid, sample))
            .collect::<ZonalResult<Vec<_>>>()?;

        let mapping = CellIndexMapping {
            grid,
            zone_ids: zones.iter().map(|z| z.id.clone()).collect(),
            entries,
        };

        info!(
            zones = mapping.len(),
            cells = mapping.total_cells(),
            empty_zones = mapping.empty_zone_count(),
            touch_rule = %self.touch_rule,
            sample = %sample.provenance,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Built cell membership mapping"
        );

        Ok(mapping)
    }

    fn zone_cells(
        &self,
        zone: &Zone,
        grid: &GridDescriptor,
        sample: &RasterLayer,
    ) -> ZonalResult<Vec<CellIndex>> {
        let geometry = boxify_points(&zone.geometry, grid);

        let Some(rect) = geometry.bounding_rect() else {
            debug!(zone = %zone.id, "Zone has an empty geometry");
            return Ok(Vec::new());
        };

        let window = grid.window_for_bbox(&BoundingBox::from(rect));
        if !window.overlaps(grid) {
            debug!(zone = %zone.id, "Zone lies outside the grid");
            return Ok(Vec::new());
        }

        let mask = rasterize(&geometry, grid, &window, self.touch_rule)?;

        let cells = mask
            .marked()
            .map(|(r, c)| window.to_grid(r, c))
            .filter(|&(row, col)| grid.contains_cell(row, col))
            .filter(|&(row, col)| {
                self.invalidity == InvalidityPolicy::GeometryOnly
                    || !sample.is_invalid_at(row, col)
            })
            .map(|(row, col)| CellIndex::new(row as usize, col as usize))
            .collect();

        Ok(cells)
    }
}

/// Compute the mapping of `zones` onto `grid`, excluding cells that are
/// invalid in `sample`.
pub fn compute_membership(
    zones: &[Zone],
    grid: &GridDescriptor,
    sample: &RasterLayer,
    touch_rule: TouchRule,
) -> ZonalResult<CellIndexMapping> {
    if !sample.grid.same_grid(grid) {
        return Err(ZonalError::configuration(format!(
            "sample layer '{}' is not aligned to the requested grid",
            sample.provenance
        )));
    }
    MembershipMapper::new(touch_rule, InvalidityPolicy::SampleLayer).compute(zones, sample)
}
