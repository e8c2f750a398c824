//! Unit conversion error types.

use thiserror::Error;

/// Errors raised by unit helpers. Plain conversions never fail.
#[derive(Debug, Error, PartialEq)]
pub enum UnitsError {
    /// An input was negative, NaN or infinite.
    #[error("Invalid {field}: {value}")]
    InvalidInput { field: &'static str, value: f64 },
}

/// Result type for unit helpers.
pub type UnitsResult<T> = Result<T, UnitsError>;
