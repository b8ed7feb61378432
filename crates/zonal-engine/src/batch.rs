//! Temporal batch driver.
//!
//! A batch reduces a sequence of layers sharing one grid onto a fixed zone
//! set. The membership mapping is built exactly once, from the first
//! selected layer, and then shared read-only by every reduction.
//!
//! ```text
//!  Uninitialized ──prepare(sample)──▶ MappingReady ──process_layer──▶ Reducing ─┐
//!                                                                     ▲         │
//!                                                                     └─────────┘
//!                                                        finish ──▶ Done
//! ```

use std::collections::BTreeSet;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use zonal_common::{Frequency, PeriodKey, RasterLayer, ZonalError, ZonalResult, Zone};

use crate::context::RunContext;
use crate::membership::{compute_membership, CellIndexMapping, MembershipMapper};
use crate::provenance::ProvenanceParser;
use crate::rasterize::TouchRule;
use crate::reducer::{zonal_reduce, Reducer};
use crate::table::StatisticTable;

/// Loads layers on demand from some collaborator (files, memory, ...).
pub trait LayerSource: Sync {
    fn load(&self, provenance: &str) -> ZonalResult<RasterLayer>;
}

impl<F> LayerSource for F
where
    F: Fn(&str) -> ZonalResult<RasterLayer> + Sync,
{
    fn load(&self, provenance: &str) -> ZonalResult<RasterLayer> {
        self(provenance)
    }
}

/// Lifecycle of a [`TemporalBatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Uninitialized,
    MappingReady,
    Reducing,
    Done,
}

/// Which layers a batch accepts and how their periods are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    pub frequency: Frequency,
    /// Only layers of this year are reduced; others are skipped.
    #[serde(default)]
    pub year: Option<i32>,
}

impl BatchOptions {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            year: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}

/// What happened to one layer handed to [`TemporalBatch::process_layer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerOutcome {
    Reduced(PeriodKey),
    /// Outside the requested year
    Skipped(PeriodKey),
}

/// Summary of a finished batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub variable: String,
    pub frequency: Frequency,
    pub statistic: String,
    /// Provenance of the layer the mapping was built from
    pub sample: Option<String>,
    pub zones: usize,
    pub empty_zones: usize,
    pub mapped_cells: usize,
    pub layers_processed: usize,
    pub layers_skipped: usize,
    pub periods: Vec<PeriodKey>,
}

/// Reduces a time series of layers onto one zone set.
pub struct TemporalBatch<'a> {
    variable: String,
    zones: &'a [Zone],
    parser: &'a dyn ProvenanceParser,
    reducer: &'a dyn Reducer,
    mapper: MembershipMapper,
    options: BatchOptions,
    context: RunContext,
    state: BatchState,
    mapping: Option<CellIndexMapping>,
    sample: Option<String>,
    table: StatisticTable,
    periods: BTreeSet<PeriodKey>,
    skipped: usize,
}

impl<'a> TemporalBatch<'a> {
    pub fn new(
        variable: impl Into<String>,
        zones: &'a [Zone],
        parser: &'a dyn ProvenanceParser,
        reducer: &'a dyn Reducer,
        options: BatchOptions,
    ) -> Self {
        let variable = variable.into();
        Self {
            table: StatisticTable::new(variable.clone(), options.frequency),
            variable,
            zones,
            parser,
            reducer,
            mapper: MembershipMapper::default(),
            options,
            context: RunContext::anonymous(),
            state: BatchState::Uninitialized,
            mapping: None,
            sample: None,
            periods: BTreeSet::new(),
            skipped: 0,
        }
    }

    pub fn with_mapper(mut self, mapper: MembershipMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_context(mut self, context: RunContext) -> Self {
        self.context = context;
        self
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn mapping(&self) -> Option<&CellIndexMapping> {
        self.mapping.as_ref()
    }

    /// Build the membership mapping from `sample`. Allowed once per batch.
    pub fn prepare(&mut self, sample: &RasterLayer) -> ZonalResult<&CellIndexMapping> {
        if self.state != BatchState::Uninitialized {
            return Err(ZonalError::configuration(format!(
                "mapping for '{}' is already built",
                self.variable
            )));
        }

        let span = self.context.span().clone();
        let _enter = span.enter();

        let mapping = self.mapper.compute(self.zones, sample)?;
        self.sample = Some(sample.provenance.clone());
        self.state = BatchState::MappingReady;
        Ok(self.mapping.insert(mapping))
    }

    /// Reduce one layer. The first accepted layer also builds the mapping.
    pub fn process_layer(&mut self, layer: &RasterLayer) -> ZonalResult<LayerOutcome> {
        if self.state == BatchState::Done {
            return Err(ZonalError::configuration("batch is already finished"));
        }

        let period = self.period_for(&layer.provenance)?;
        if !self.accepts(period) {
            self.skip(&layer.provenance, period);
            return Ok(LayerOutcome::Skipped(period));
        }
        self.ensure_unclaimed(&layer.provenance, period)?;

        if self.state == BatchState::Uninitialized {
            self.prepare(layer)?;
        }

        let span = self.context.span().clone();
        let _enter = span.enter();

        let mapping = self
            .mapping
            .as_ref()
            .ok_or_else(|| ZonalError::configuration("mapping missing after prepare"))?;
        let values = zonal_reduce(mapping, layer, self.reducer)?;
        self.table.push_period(period, mapping.zone_ids(), values);
        self.periods.insert(period);
        self.state = BatchState::Reducing;

        debug!(provenance = %layer.provenance, period = %period, "Reduced layer");
        Ok(LayerOutcome::Reduced(period))
    }

    /// Resolve, load and reduce every layer of `provenances`.
    ///
    /// All periods are resolved before any layer is read, so a bad file
    /// name aborts the batch up front. Layers after the sample are reduced
    /// in parallel; records are ordered by period regardless of completion
    /// order.
    pub fn run(
        mut self,
        provenances: &[String],
        source: &dyn LayerSource,
    ) -> ZonalResult<(StatisticTable, BatchReport)> {
        if self.state != BatchState::Uninitialized {
            return Err(ZonalError::configuration("run() needs a fresh batch"));
        }

        let span = self.context.span().clone();
        let _enter = span.enter();
        let start = Instant::now();

        let mut selected: Vec<(PeriodKey, &str)> = Vec::with_capacity(provenances.len());
        for provenance in provenances {
            let period = self.period_for(provenance)?;
            if !self.accepts(period) {
                self.skip(provenance, period);
                continue;
            }
            self.claim_period(provenance, period)?;
            selected.push((period, provenance.as_str()));
        }

        let Some(&(first_period, first_provenance)) = selected.first() else {
            return self.finish();
        };

        info!(
            variable = %self.variable,
            layers = selected.len(),
            skipped = self.skipped,
            frequency = %self.options.frequency,
            "Starting temporal batch"
        );

        let sample = source.load(first_provenance)?;
        self.prepare(&sample)?;
        let mapping = self
            .mapping
            .as_ref()
            .ok_or_else(|| ZonalError::configuration("mapping missing after prepare"))?;
        let reducer = self.reducer;

        let first = zonal_reduce(mapping, &sample, reducer)?;
        drop(sample);

        let mut reduced = selected[1..]
            .par_iter()
            .map(|&(period, provenance)| {
                let _enter = span.enter();
                let layer = source.load(provenance)?;
                let values = zonal_reduce(mapping, &layer, reducer)?;
                debug!(provenance, period = %period, "Reduced layer");
                Ok((period, values))
            })
            .collect::<ZonalResult<Vec<_>>>()?;
        reduced.push((first_period, first));
        reduced.sort_by_key(|(period, _)| *period);

        for (period, values) in reduced {
            self.table.push_period(period, mapping.zone_ids(), values);
        }
        self.state = BatchState::Reducing;

        info!(
            variable = %self.variable,
            layers = self.periods.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Temporal batch reduced"
        );

        self.finish()
    }

    /// Close the batch and return its table and report.
    pub fn finish(mut self) -> ZonalResult<(StatisticTable, BatchReport)> {
        if self.periods.is_empty() {
            return Err(ZonalError::configuration(format!(
                "no layers selected for '{}' ({} skipped)",
                self.variable, self.skipped
            )));
        }

        self.table.sort_by_period();
        self.state = BatchState::Done;

        let (empty_zones, mapped_cells) = self
            .mapping
            .as_ref()
            .map(|m| (m.empty_zone_count(), m.total_cells()))
            .unwrap_or_default();

        let report = BatchReport {
            run_id: self.context.run_id(),
            variable: self.variable,
            frequency: self.options.frequency,
            statistic: self.reducer.name().to_string(),
            sample: self.sample,
            zones: self.zones.len(),
            empty_zones,
            mapped_cells,
            layers_processed: self.periods.len(),
            layers_skipped: self.skipped,
            periods: self.periods.into_iter().collect(),
        };

        Ok((self.table, report))
    }

    fn period_for(&self, provenance: &str) -> ZonalResult<PeriodKey> {
        let period = self.parser.parse(provenance)?;
        match (self.options.frequency.has_month(), period.month) {
            (true, None) => Err(ZonalError::provenance(
                provenance,
                "monthly batch needs a month in every period",
            )),
            (false, Some(_)) => Ok(PeriodKey::annual(period.year)),
            _ => Ok(period),
        }
    }

    fn accepts(&self, period: PeriodKey) -> bool {
        self.options.year.map_or(true, |year| period.year == year)
    }

    fn skip(&mut self, provenance: &str, period: PeriodKey) {
        self.skipped += 1;
        info!(provenance, period = %period, "Skipping layer outside requested year");
    }

    fn ensure_unclaimed(&self, provenance: &str, period: PeriodKey) -> ZonalResult<()> {
        if self.periods.contains(&period) {
            return Err(ZonalError::provenance(
                provenance,
                format!("period {period} is already covered by another layer"),
            ));
        }
        Ok(())
    }

    fn claim_period(&mut self, provenance: &str, period: PeriodKey) -> ZonalResult<()> {
        self.ensure_unclaimed(provenance, period)?;
        self.periods.insert(period);
        Ok(())
    }
}

/// Reference path: build a fresh mapping against `layer` itself and reduce.
pub fn zonal_stats_unamortized(
    zones: &[Zone],
    layer: &RasterLayer,
    touch_rule: TouchRule,
    reducer: &dyn Reducer,
) -> ZonalResult<Vec<Option<f64>>> {
    let mapping = compute_membership(zones, &layer.grid, layer, touch_rule)?;
    zonal_reduce(&mapping, layer, reducer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::FilenamePeriodParser;
    use crate::reducer::Statistic;
    use geo::polygon;
    use zonal_common::{GridDescriptor, Nodata};

    fn grid() -> GridDescriptor {
        GridDescriptor::new(0.0, 1.0, 1.0, 1.0, 1, 2).unwrap()
    }

    fn zones() -> Vec<Zone> {
        vec![Zone::new(
            "z",
            polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 0.0, y: 1.0)],
        )]
    }

    fn layer(name: &str, a: f32, b: f32) -> RasterLayer {
        RasterLayer::new(grid(), vec![a, b], Nodata::nan(), name).unwrap()
    }

    #[test]
    fn test_state_transitions() {
        let zones = zones();
        let parser = FilenamePeriodParser::new(Frequency::Annual);
        let mut batch = TemporalBatch::new(
            "v",
            &zones,
            &parser,
            &Statistic::Mean,
            BatchOptions::new(Frequency::Annual),
        );
        assert_eq!(batch.state(), BatchState::Uninitialized);

        let outcome = batch.process_layer(&layer("v_2020.nc", 1.0, 3.0)).unwrap();
        assert_eq!(outcome, LayerOutcome::Reduced(PeriodKey::annual(2020)));
        assert_eq!(batch.state(), BatchState::Reducing);
        assert!(batch.prepare(&layer("v_2021.nc", 0.0, 0.0)).is_err());

        batch.process_layer(&layer("v_2021.nc", 5.0, 7.0)).unwrap();
        let (table, report) = batch.finish().unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[1].value, Some(6.0));
        assert_eq!(report.layers_processed, 2);
        assert_eq!(report.sample.as_deref(), Some("v_2020.nc"));
    }

    #[test]
    fn test_year_filter_skips_layers() {
        let zones = zones();
        let parser = FilenamePeriodParser::new(Frequency::Annual);
        let batch = TemporalBatch::new(
            "v",
            &zones,
            &parser,
            &Statistic::Mean,
            BatchOptions::new(Frequency::Annual).with_year(2021),
        );
        let files = vec!["v_2020.nc".to_string(), "v_2021.nc".to_string()];
        let source = |p: &str| -> ZonalResult<RasterLayer> { Ok(layer(p, 2.0, 4.0)) };

        let (table, report) = batch.run(&files, &source).unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].period, PeriodKey::annual(2021));
        assert_eq!(report.layers_skipped, 1);
        assert_eq!(report.sample.as_deref(), Some("v_2021.nc"));
    }

    #[test]
    fn test_all_layers_skipped_is_error() {
        let zones = zones();
        let parser = FilenamePeriodParser::new(Frequency::Annual);
        let batch = TemporalBatch::new(
            "v",
            &zones,
            &parser,
            &Statistic::Mean,
            BatchOptions::new(Frequency::Annual).with_year(1999),
        );
        let files = vec!["v_2020.nc".to_string()];
        let source = |p: &str| -> ZonalResult<RasterLayer> { Ok(layer(p, 2.0, 4.0)) };
        assert!(batch.run(&files, &source).unwrap_err().is_configuration());
    }

    #[test]
    fn test_duplicate_period_is_provenance_error() {
        let zones = zones();
        let parser = FilenamePeriodParser::new(Frequency::Annual);
        let batch = TemporalBatch::new(
            "v",
            &zones,
            &parser,
            &Statistic::Mean,
            BatchOptions::new(Frequency::Annual),
        );
        let files = vec!["a_2020.nc".to_string(), "b_2020.nc".to_string()];
        let source = |p: &str| -> ZonalResult<RasterLayer> { Ok(layer(p, 2.0, 4.0)) };
        assert!(matches!(
            batch.run(&files, &source).unwrap_err(),
            ZonalError::Provenance { .. }
        ));
    }

    #[test]
    fn test_layer_on_other_grid_is_rejected() {
        let zones = zones();
        let parser = FilenamePeriodParser::new(Frequency::Annual);
        let batch = TemporalBatch::new(
            "v",
            &zones,
            &parser,
            &Statistic::Mean,
            BatchOptions::new(Frequency::Annual),
        );
        let files = vec!["v_2020.nc".to_string(), "v_2021.nc".to_string()];
        let source = |p: &str| -> ZonalResult<RasterLayer> {
            if p.contains("2021") {
                let other = GridDescriptor::new(0.0, 1.0, 0.5, 0.5, 2, 4)?;
                RasterLayer::new(other, vec![0.0; 8], Nodata::nan(), p)
            } else {
                Ok(layer(p, 1.0, 1.0))
            }
        };
        assert!(batch.run(&files, &source).unwrap_err().is_configuration());
    }

    #[test]
    fn test_failed_layer_does_not_claim_period() {
        let zones = zones();
        let parser = FilenamePeriodParser::new(Frequency::Annual);
        let mut batch = TemporalBatch::new(
            "v",
            &zones,
            &parser,
            &Statistic::Mean,
            BatchOptions::new(Frequency::Annual),
        );
        let other = GridDescriptor::new(0.0, 1.0, 0.5, 0.5, 2, 4).unwrap();
        let misaligned = RasterLayer::new(other, vec![0.0; 8], Nodata::nan(), "v_2021.nc").unwrap();

        batch.process_layer(&layer("v_2020.nc", 1.0, 1.0)).unwrap();
        assert!(batch.process_layer(&misaligned).unwrap_err().is_configuration());

        let outcome = batch.process_layer(&layer("v_2021.nc", 2.0, 4.0)).unwrap();
        assert_eq!(outcome, LayerOutcome::Reduced(PeriodKey::annual(2021)));
        let (table, report) = batch.finish().unwrap();
        assert_eq!(report.layers_processed, 2);
        assert_eq!(table.records[1].value, Some(3.0));
    }
}
