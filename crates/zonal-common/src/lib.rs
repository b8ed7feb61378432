//! Common types shared across the raster-zonal workspace.
//!
//! Grid descriptors, raster layers, zones, period keys and the error
//! taxonomy used by the aggregation engine and its collaborators.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod layer;
pub mod period;
pub mod zone;

pub use bbox::BoundingBox;
pub use error::{ZonalError, ZonalResult};
pub use grid::{CellIndex, CoordinateRegistration, GridDescriptor, GridWindow, RowOrder};
pub use layer::{Nodata, RasterLayer};
pub use period::{month_from_abbreviation, Frequency, PeriodKey};
pub use zone::{Zone, ZoneId};
