//! FX error types.

use std::time::Duration;

use multiconv_common::CurrencyPair;
use thiserror::Error;

/// Errors that can occur while fetching or looking up rates.
#[derive(Debug, Error)]
pub enum FxError {
    /// Transport-level failure talking to the rate provider.
    #[error("Network error: {0}")]
    Network(String),

    /// Provider answered with a non-success status.
    #[error("Rate provider returned HTTP {status}")]
    Http { status: u16 },

    /// Payload is not a JSON object or has no `rates` object.
    #[error("Invalid rates payload: {0}")]
    Parse(String),

    /// `rates` object present but empty.
    #[error("Rate provider returned no rates")]
    EmptyRates,

    /// No response within the fetch budget.
    #[error("Rate fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Rate not in the cache. Not a failure: refresh and try again.
    #[error("Rate not found for {0}")]
    RateNotFound(CurrencyPair),

    /// Fetch abandoned because the controller is shutting down.
    #[error("Rate fetch cancelled")]
    Cancelled,

    /// HTTP client could not be constructed.
    #[error("Rate client error: {0}")]
    Client(String),
}

impl FxError {
    /// Check if a later refresh may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FxError::Network(_) | FxError::Http { .. } | FxError::Timeout(_) | FxError::RateNotFound(_)
        )
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::Network(_) => "NETWORK_ERROR",
            FxError::Http { .. } => "HTTP_ERROR",
            FxError::Parse(_) => "PARSE_ERROR",
            FxError::EmptyRates => "EMPTY_RATES",
            FxError::Timeout(_) => "TIMEOUT",
            FxError::RateNotFound(_) => "RATE_NOT_FOUND",
            FxError::Cancelled => "CANCELLED",
            FxError::Client(_) => "CLIENT_ERROR",
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
