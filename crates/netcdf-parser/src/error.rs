//! Error types for NetCDF reading operations.

use thiserror::Error;
use zonal_common::ZonalError;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF reading.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The netcdf library failed to open or read the file
    #[error("Failed to read NetCDF: {0}")]
    ReadError(String),

    /// Missing required variable or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Data variable does not have exactly two spatial dimensions
    #[error("variable '{variable}' must be 2-D (lat, lon), found dimensions {dims:?}")]
    NotTwoDimensional { variable: String, dims: Vec<String> },

    /// Coordinates do not describe a regular grid
    #[error(transparent)]
    Grid(#[from] ZonalError),
}

impl From<NetCdfError> for ZonalError {
    fn from(err: NetCdfError) -> Self {
        match err {
            NetCdfError::IoError(e) => ZonalError::io(e.to_string()),
            NetCdfError::ReadError(msg) => ZonalError::io(msg),
            NetCdfError::Grid(inner) => inner,
            other => ZonalError::configuration(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensionality_is_configuration_error() {
        let err = NetCdfError::NotTwoDimensional {
            variable: "PM25".to_string(),
            dims: vec!["time".into(), "lat".into(), "lon".into()],
        };
        let zonal: ZonalError = err.into();
        assert!(zonal.is_configuration());
    }

    #[test]
    fn test_read_failure_is_io_error() {
        let zonal: ZonalError = NetCdfError::ReadError("truncated".into()).into();
        assert!(matches!(zonal, ZonalError::Io(_)));
    }
}
