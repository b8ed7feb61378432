//! NetCDF reader for gridded surface products.
//!
//! Reads one 2-D variable on a regular lat/lon grid into a north-up
//! [`zonal_common::RasterLayer`], deriving the grid from the 1-D coordinate
//! variables and unpacking CF `scale_factor` / `add_offset` values.
//!
//! # Example
//!
//! ```ignore
//! use netcdf_parser::{read_layer, LayerRequest};
//!
//! let request = LayerRequest::new("GWRPM25").with_coordinates("lon", "lat");
//! let layer = read_layer("V5GL04.HybridPM25.Global.202201-202201.nc", &request)?;
//! println!("{} valid cells", layer.valid_count());
//! ```

pub mod error;
pub mod native;

// Re-export commonly used types at crate root
pub use error::{NetCdfError, NetCdfResult};
pub use native::{read_grid, read_layer, silence_hdf5_errors, LayerRequest};
