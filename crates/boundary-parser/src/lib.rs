//! Boundary reader for polygon zones.
//!
//! Reads an ESRI shapefile into the ordered `Vec<Zone>` the aggregation
//! engine maps onto a grid. The identifier attribute is chosen by the caller
//! (e.g. `GEOID` for counties).
//!
//! # Example
//!
//! ```ignore
//! use boundary_parser::read_zones;
//!
//! let counties = read_zones("boundaries/county_2020/county.shp", "GEOID")?;
//! ```

pub mod error;
pub mod reader;

pub use error::{BoundaryError, BoundaryResult};
pub use reader::read_zones;
