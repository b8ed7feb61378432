//! Error types for boundary reading.

use thiserror::Error;
use zonal_common::ZonalError;

/// Result type for boundary parser operations.
pub type BoundaryResult<T> = Result<T, BoundaryError>;

#[derive(Error, Debug)]
pub enum BoundaryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shapefile error: {0}")]
    Shapefile(String),

    /// The id attribute is not a column of the attribute table
    #[error("attribute '{field}' not found on record {record}")]
    MissingField { field: String, record: usize },

    /// The id attribute is empty for one record
    #[error("record {record} has no value for '{field}'")]
    MissingId { record: usize, field: String },

    #[error("record {record}: unsupported shape type {kind}")]
    UnsupportedShape { record: usize, kind: String },

    #[error("no zones found in {0}")]
    NoZones(String),
}

impl From<shapefile::Error> for BoundaryError {
    fn from(e: shapefile::Error) -> Self {
        BoundaryError::Shapefile(e.to_string())
    }
}

impl From<BoundaryError> for ZonalError {
    fn from(err: BoundaryError) -> Self {
        match err {
            BoundaryError::Io(e) => ZonalError::io(e.to_string()),
            BoundaryError::Shapefile(msg) => ZonalError::io(msg),
            BoundaryError::UnsupportedShape { .. } => ZonalError::InvalidGeometry(err.to_string()),
            other => ZonalError::configuration(other.to_string()),
        }
    }
}
