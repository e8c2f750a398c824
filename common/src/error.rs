//! Error types shared across the converter.

use crate::{Currency, CurrencyPair};
use thiserror::Error;

/// Top-level error type for converter operations.
#[derive(Error, Debug)]
pub enum ConverterError {
    /// Input could not be read as a number.
    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    /// No refresh could be started for a missing rate.
    #[error("Rates for {0} are unavailable")]
    RatesUnavailable(CurrencyPair),

    /// The loaded rates do not list this currency.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(Currency),

    /// No cached rate yet; a refresh has been requested.
    #[error("Rates for {0} are updating, try again in a moment")]
    RatesUpdating(CurrencyPair),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl ConverterError {
    /// Check if the caller should simply retry later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConverterError::RatesUpdating(_))
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConverterError::InvalidNumber(_) => "INVALID_NUMBER",
            ConverterError::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
            ConverterError::RatesUpdating(_) => "RATES_UPDATING",
            ConverterError::RatesUnavailable(_) => "RATES_UNAVAILABLE",
            ConverterError::ConfigurationError(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type alias for converter operations.
pub type Result<T> = std::result::Result<T, ConverterError>;

/// Parse a user-entered number the way the input field accepts it.
pub fn parse_value(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ConverterError::InvalidNumber(trimmed.to_string())),
    }
}
