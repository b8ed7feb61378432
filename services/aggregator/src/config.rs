//! Run configuration for the aggregator.
//!
//! One YAML file describes where inputs live, how the engine maps and
//! reduces, which variables and boundary sets exist, and how to log.
//! Values may reference the environment with `${VAR}` or
//! `${VAR:-default}`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use zonal_engine::{EngineConfig, VariableRegistry, VariableSpec, VintageDirection, VintageTable};

// ============================================================================
// Configuration types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub paths: PathsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    pub variables: Vec<VariableSpec>,
    pub boundaries: BTreeMap<String, BoundaryConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the raw NetCDF inputs, one subdirectory per variable
    pub input: PathBuf,
    /// Per-variable long tables
    pub intermediate: PathBuf,
    /// Merged wide tables
    pub output: PathBuf,
}

/// One polygon set (e.g. counties) with its dated shapefiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Attribute holding the zone identifier
    pub id_field: String,
    /// Which vintage to pick when the requested year has none
    #[serde(default)]
    pub vintage: VintageDirection,
    /// Year -> shapefile path
    pub vintages: BTreeMap<i32, PathBuf>,
}

impl BoundaryConfig {
    pub fn vintage_table(&self) -> VintageTable<PathBuf> {
        VintageTable::new(self.vintages.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

impl AggregatorConfig {
    /// Build the variable registry; fails on empty or duplicate names.
    pub fn registry(&self) -> Result<VariableRegistry> {
        Ok(VariableRegistry::new(self.variables.iter().cloned())?)
    }

    pub fn boundary(&self, polygons: &str) -> Result<&BoundaryConfig> {
        self.boundaries.get(polygons).with_context(|| {
            format!(
                "unknown polygon set '{}' (known: {})",
                polygons,
                self.boundaries.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Read, expand, parse and validate a configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AggregatorConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
    parse_config(&content)
        .with_context(|| format!("Invalid config in {:?}", path.as_ref()))
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<AggregatorConfig> {
    let expanded = expand_env_vars(content)?;
    let config: AggregatorConfig =
        serde_yaml::from_str(&expanded).with_context(|| "Failed to parse config YAML")?;
    validate_config(&config)?;
    Ok(config)
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve a single expression (`VAR` or `VAR:-default`).
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_config(config: &AggregatorConfig) -> Result<()> {
    for (name, path) in [
        ("input", &config.paths.input),
        ("intermediate", &config.paths.intermediate),
        ("output", &config.paths.output),
    ] {
        anyhow::ensure!(
            !path.as_os_str().is_empty(),
            "paths.{} cannot be empty",
            name
        );
    }

    config.engine.validate().map_err(anyhow::Error::msg)?;

    anyhow::ensure!(
        !config.variables.is_empty(),
        "At least one variable must be configured"
    );
    config.registry()?;

    anyhow::ensure!(
        !config.boundaries.is_empty(),
        "At least one boundary set must be configured"
    );
    for (name, boundary) in &config.boundaries {
        anyhow::ensure!(
            !boundary.id_field.trim().is_empty(),
            "boundaries.{}.id_field cannot be empty",
            name
        );
        anyhow::ensure!(
            !boundary.vintages.is_empty(),
            "boundaries.{} needs at least one vintage",
            name
        );
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    anyhow::ensure!(
        valid_levels.contains(&config.logging.level.as_str()),
        "Invalid log level: {}. Must be one of: {:?}",
        config.logging.level,
        valid_levels
    );

    let valid_formats = ["json", "pretty"];
    anyhow::ensure!(
        valid_formats.contains(&config.logging.format.as_str()),
        "Invalid log format: {}. Must be one of: {:?}",
        config.logging.format,
        valid_formats
    );

    Ok(())
}
