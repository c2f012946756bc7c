//! Validation Error Types

use thiserror::Error;

/// Errors in a named sensor input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// NaN or infinite value
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: String, value: f64 },

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors applying a fitted scaler
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScaleError {
    #[error("Dimension mismatch: scaler fitted on {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cannot fit scaler on an empty data set")]
    EmptyInput,
}
