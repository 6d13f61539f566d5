//! Geometry error types

use thiserror::Error;

/// Errors raised while building geometry values from untrusted input
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    /// Rectangle array does not hold exactly four numbers
    #[error("Invalid rectangle: expected 4 coordinates, got {0}")]
    InvalidRect(usize),

    /// Rectangle contains NaN or infinite values
    #[error("Invalid rectangle: non-finite coordinate")]
    NonFinite,

    /// Scale, DPI or page height is not strictly positive
    #[error("Invalid conversion parameters: {0}")]
    InvalidParameters(String),
}
