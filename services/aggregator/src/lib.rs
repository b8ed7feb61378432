//! Aggregation service: YAML-configured runs that reduce NetCDF products
//! onto polygon boundaries and persist the results as Parquet.
//!
//! ```text
//!   NetCDF files ──► netcdf-parser ──┐
//!                                    ├─► zonal-engine ──► long table ──► merge ──► wide table
//!   shapefiles ──► boundary-parser ──┘    (per variable)                 (per polygon set)
//! ```

pub mod config;
pub mod output;
pub mod pipeline;

pub use config::{load_config, parse_config, AggregatorConfig, BoundaryConfig};
pub use pipeline::{aggregate, merge, AggregateOutcome, AggregateRequest, MergeRequest};
