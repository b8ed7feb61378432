//! Aggregate and merge runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use netcdf_parser::LayerRequest;
use serde::{Deserialize, Serialize};
use tracing::info;
use walkdir::WalkDir;
use zonal_common::{Frequency, RasterLayer, ZonalResult};
use zonal_engine::{
    merge_wide, BatchOptions, BatchReport, FilenamePeriodParser, RunContext, TemporalBatch,
    VariableRegistry, VariableSpec,
};

use crate::config::AggregatorConfig;
use crate::output::{read_long_table, write_long_table, write_wide_table};

/// One variable, one polygon set, one year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRequest {
    pub variable: String,
    pub polygons: String,
    pub year: i32,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateOutcome {
    pub table_path: PathBuf,
    pub report_path: PathBuf,
    /// Boundary vintage the zones were read from
    pub vintage: i32,
    pub report: BatchReport,
}

/// Several variables already aggregated for the same polygons and year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub variables: Vec<String>,
    pub polygons: String,
    pub year: i32,
    pub frequency: Frequency,
}

/// `<intermediate>/<variable>/<variable>__<polygons>_<freq>_<year>.parquet`
pub fn intermediate_path(
    config: &AggregatorConfig,
    variable: &str,
    polygons: &str,
    frequency: Frequency,
    year: i32,
) -> PathBuf {
    config
        .paths
        .intermediate
        .join(variable)
        .join(format!("{variable}__{polygons}_{frequency}_{year}.parquet"))
}

/// `<output>/<polygons>_<freq>/merged__<polygons>_<freq>_<year>.parquet`
pub fn merged_path(
    config: &AggregatorConfig,
    polygons: &str,
    frequency: Frequency,
    year: i32,
) -> PathBuf {
    config
        .paths
        .output
        .join(format!("{polygons}_{frequency}"))
        .join(format!("merged__{polygons}_{frequency}_{year}.parquet"))
}

/// Reduce every layer of one variable onto one polygon set.
pub fn aggregate(
    config: &AggregatorConfig,
    registry: &VariableRegistry,
    request: &AggregateRequest,
) -> Result<AggregateOutcome> {
    let spec = registry.get(&request.variable)?;
    let boundary = config.boundary(&request.polygons)?;

    let vintages = boundary.vintage_table();
    let (vintage, shapefile) = vintages.resolve(request.year, boundary.vintage)?;
    info!(
        polygons = %request.polygons,
        year = request.year,
        vintage,
        path = %shapefile.display(),
        "Resolved boundary vintage"
    );

    let zones = boundary_parser::read_zones(shapefile, &boundary.id_field)
        .with_context(|| format!("Failed to read boundaries from {:?}", shapefile))?;

    let input_dir = config.paths.input.join(spec.input_dir());
    let files = list_layer_files(&input_dir)?;
    anyhow::ensure!(
        !files.is_empty(),
        "No NetCDF files found under {:?}",
        input_dir
    );

    let layer_request = layer_request(spec, config);
    let source = |path: &str| -> ZonalResult<RasterLayer> {
        Ok(netcdf_parser::read_layer(path, &layer_request)?)
    };

    let parser = FilenamePeriodParser::new(request.frequency);
    let statistic = config.engine.statistic;
    let context = RunContext::new(&request.variable, &request.polygons, Some(request.year));

    let (table, report) = TemporalBatch::new(
        request.variable.as_str(),
        &zones,
        &parser,
        &statistic,
        BatchOptions::new(request.frequency).with_year(request.year),
    )
    .with_mapper(config.engine.mapper())
    .with_context(context)
    .run(&files, &source)
    .with_context(|| format!("Aggregation of '{}' failed", request.variable))?;

    let table_path = intermediate_path(
        config,
        &request.variable,
        &request.polygons,
        request.frequency,
        request.year,
    );
    write_long_table(&table_path, &table, &boundary.id_field)?;

    let report_path = table_path.with_extension("report.json");
    let report_json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&report_path, report_json)
        .with_context(|| format!("Failed to write report to {:?}", report_path))?;

    info!(
        run_id = %report.run_id,
        variable = %request.variable,
        layers = report.layers_processed,
        skipped = report.layers_skipped,
        empty_zones = report.empty_zones,
        path = %table_path.display(),
        "Aggregation complete"
    );

    Ok(AggregateOutcome {
        table_path,
        report_path,
        vintage,
        report,
    })
}

/// Outer-join previously aggregated variables into one wide table.
pub fn merge(
    config: &AggregatorConfig,
    registry: &VariableRegistry,
    request: &MergeRequest,
) -> Result<PathBuf> {
    anyhow::ensure!(!request.variables.is_empty(), "No variables to merge");
    registry.resolve_all(&request.variables)?;
    let boundary = config.boundary(&request.polygons)?;

    let tables = request
        .variables
        .iter()
        .map(|variable| {
            let path = intermediate_path(
                config,
                variable,
                &request.polygons,
                request.frequency,
                request.year,
            );
            read_long_table(&path, variable, &boundary.id_field, request.frequency)
                .with_context(|| format!("Failed to read intermediate table {:?}", path))
        })
        .collect::<Result<Vec<_>>>()?;

    let wide = merge_wide(&tables)?;
    let path = merged_path(config, &request.polygons, request.frequency, request.year);
    write_wide_table(&path, &wide, &boundary.id_field)?;

    info!(
        polygons = %request.polygons,
        variables = ?wide.variables,
        rows = wide.len(),
        path = %path.display(),
        "Merge complete"
    );
    Ok(path)
}

fn layer_request(spec: &VariableSpec, config: &AggregatorConfig) -> LayerRequest {
    LayerRequest::new(spec.layer.as_str())
        .with_coordinates(spec.longitude.as_str(), spec.latitude.as_str())
        .with_nodata(spec.nodata)
        .with_registration(config.engine.registration)
}

/// All `*.nc` files under `dir`, sorted by path.
pub fn list_layer_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to list {:?}", dir))?;
        let is_netcdf = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("nc"));
        if entry.file_type().is_file() && is_netcdf {
            files.push(entry.path().to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(files)
}
