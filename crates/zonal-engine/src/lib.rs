//! Amortized Zonal Statistics Engine
//!
//! This crate aggregates gridded raster layers onto a fixed set of zones
//! (polygons), one statistic per zone per period. The zone-to-cell mapping
//! is computed once per grid and reused for every layer of a time series:
//!
//! - **Mapping once**: rasterization cost is paid by the first layer only
//! - **Cheap layers**: every further layer is an index gather + reduction
//! - **Parallel**: zones and layers are reduced with rayon, output order
//!   stays deterministic
//!
//! # Architecture
//!
//! ```text
//! Zones + sample layer
//!      │
//!      ▼
//! MembershipMapper::compute()           (once per batch)
//!      │
//!      ├─► boxify points, window per zone bbox
//!      ├─► rasterize (all-touched | cell-center)
//!      └─► drop cells invalid in the sample
//!               │
//!               ▼
//!        CellIndexMapping (read-only, shared)
//!               │
//!   ┌───────────┼───────────┐
//!   ▼           ▼           ▼
//! layer 1    layer 2  ...  layer N      zonal_reduce() per layer
//!   └───────────┼───────────┘
//!               ▼
//!        StatisticTable (per variable)
//!               │
//!               ▼
//!        merge_wide() across variables ─► WideTable
//! ```
//!
//! # Example
//!
//! ```ignore
//! use zonal_engine::{BatchOptions, FilenamePeriodParser, Statistic, TemporalBatch};
//! use zonal_common::Frequency;
//!
//! let parser = FilenamePeriodParser::new(Frequency::Monthly);
//! let batch = TemporalBatch::new(
//!     "pm25",
//!     &zones,
//!     &parser,
//!     &Statistic::Mean,
//!     BatchOptions::new(Frequency::Monthly).with_year(2022),
//! );
//! let (table, report) = batch.run(&files, &source)?;
//! ```

pub mod batch;
pub mod config;
pub mod context;
pub mod membership;
pub mod merge;
pub mod provenance;
pub mod rasterize;
pub mod reducer;
pub mod table;
pub mod variables;
pub mod vintage;

// Re-export commonly used types at crate root
pub use batch::{
    zonal_stats_unamortized, BatchOptions, BatchReport, BatchState, LayerOutcome, LayerSource,
    TemporalBatch,
};
pub use config::EngineConfig;
pub use context::RunContext;
pub use membership::{compute_membership, CellIndexMapping, InvalidityPolicy, MembershipMapper};
pub use merge::{merge_wide, WideRow, WideTable};
pub use provenance::{FilenamePeriodParser, ProvenanceParser};
pub use rasterize::{boxify_points, rasterize, TouchRule, WindowMask};
pub use reducer::{zonal_reduce, Reducer, Statistic};
pub use table::{StatisticRecord, StatisticTable};
pub use variables::{VariableRegistry, VariableSpec};
pub use vintage::{resolve_vintage, VintageDirection, VintageTable};
