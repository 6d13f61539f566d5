//! Calibration error types

use thiserror::Error;

use crate::geometry::GeometryError;

/// Errors that stop an extraction run
///
/// Individual fields without a usable rectangle are not errors; they are
/// passed through and listed in the output metadata.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// Reference field absent from the coordinate dataset
    #[error("Reference field not found: {0}")]
    ReferenceNotFound(String),

    /// Reference field present but unusable
    #[error("Reference field {field} has no usable rectangle: {reason}")]
    InvalidReference { field: String, reason: String },

    /// Known-correct reference position is degenerate
    #[error("Reference position for {0} has zero width or height")]
    DegenerateReference(String),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for calibration operations
pub type Result<T> = std::result::Result<T, CalibrationError>;
