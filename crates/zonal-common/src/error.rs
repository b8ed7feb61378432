//! Error types for raster-to-polygon aggregation.

use thiserror::Error;

/// Result type alias using ZonalError.
pub type ZonalResult<T> = Result<T, ZonalError>;

/// Primary error type for aggregation runs.
///
/// A polygon without qualifying cells, or a variable absent for some key
/// during a merge, is not an error: those surface as `None` values.
#[derive(Debug, Error)]
pub enum ZonalError {
    // === Fatal before any mapping work ===
    #[error("configuration error: {0}")]
    Configuration(String),

    // === Fatal for the batch ===
    #[error("cannot resolve period for '{provenance}': {reason}")]
    Provenance { provenance: String, reason: String },

    #[error("unsupported geometry: {0}")]
    InvalidGeometry(String),

    #[error("duplicate record for key {0}")]
    DuplicateRecord(String),

    // === Collaborator errors ===
    #[error("I/O error: {0}")]
    Io(String),
}

impl ZonalError {
    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a Provenance error.
    pub fn provenance(provenance: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provenance {
            provenance: provenance.into(),
            reason: reason.into(),
        }
    }

    /// Create an Io error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Whether this error aborts the run before any mapping work.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ZonalError::Configuration(_))
    }
}

impl From<std::io::Error> for ZonalError {
    fn from(err: std::io::Error) -> Self {
        ZonalError::Io(err.to_string())
    }
}
