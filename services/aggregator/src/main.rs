//! Raster-to-polygon aggregation CLI.
//!
//! `aggregate` reduces one variable's NetCDF layers onto a polygon set;
//! `merge` joins previously aggregated variables into one wide table.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zonal_common::Frequency;

use aggregator::{aggregate, load_config, merge, AggregateRequest, MergeRequest};

#[derive(Parser, Debug)]
#[command(name = "aggregator")]
#[command(about = "Aggregates gridded NetCDF products onto polygon boundaries")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "AGGREGATOR_CONFIG", default_value = "config/aggregator.yaml")]
    config: PathBuf,

    /// Log level (overrides the config file)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reduce one variable onto one polygon set for one year
    Aggregate {
        #[arg(long)]
        variable: String,

        #[arg(long)]
        polygons: String,

        #[arg(long)]
        year: i32,

        #[arg(long, default_value = "annual")]
        frequency: Frequency,
    },

    /// Merge aggregated variables into one wide table
    Merge {
        /// Comma-separated variable names
        #[arg(long, value_delimiter = ',', required = true)]
        variables: Vec<String>,

        #[arg(long)]
        polygons: String,

        #[arg(long)]
        year: i32,

        #[arg(long, default_value = "annual")]
        frequency: Frequency,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = load_config(&args.config)?;

    // Initialize tracing
    let level_name = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let level = match level_name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);
    if config.logging.is_json() {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    netcdf_parser::silence_hdf5_errors();

    if let Some(threads) = config.engine.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let registry = config.registry()?;
    info!(
        config = %args.config.display(),
        variables = ?registry.names(),
        "Loaded configuration"
    );

    match args.command {
        Command::Aggregate {
            variable,
            polygons,
            year,
            frequency,
        } => {
            let request = AggregateRequest {
                variable,
                polygons,
                year,
                frequency,
            };
            let outcome = aggregate(&config, &registry, &request)?;
            info!(
                path = %outcome.table_path.display(),
                vintage = outcome.vintage,
                "Wrote aggregated table"
            );
        }
        Command::Merge {
            variables,
            polygons,
            year,
            frequency,
        } => {
            let request = MergeRequest {
                variables,
                polygons,
                year,
                frequency,
            };
            let path = merge(&config, &registry, &request)?;
            info!(path = %path.display(), "Wrote merged table");
        }
    }

    Ok(())
}
