//! Status notifications for the presentation layer.

use std::fmt;

use multiconv_common::{format_clock, Timestamp};
use serde::Serialize;

use crate::error::FxError;

/// Status line shown next to the currency controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusMessage {
    Ready,
    Fetching,
    Updated { at: Timestamp },
    Failed,
    InvalidData,
    Empty,
    TimedOut,
    Cancelled,
}

impl StatusMessage {
    /// Whether this reports a failed fetch.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StatusMessage::Failed
                | StatusMessage::InvalidData
                | StatusMessage::Empty
                | StatusMessage::TimedOut
        )
    }
}

impl From<&FxError> for StatusMessage {
    fn from(error: &FxError) -> Self {
        match error {
            FxError::Parse(_) => StatusMessage::InvalidData,
            FxError::EmptyRates => StatusMessage::Empty,
            FxError::Timeout(_) => StatusMessage::TimedOut,
            FxError::Cancelled => StatusMessage::Cancelled,
            FxError::Network(_)
            | FxError::Http { .. }
            | FxError::Client(_)
            | FxError::RateNotFound(_) => StatusMessage::Failed,
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::Ready => f.write_str("Ready"),
            StatusMessage::Fetching => f.write_str("Fetching rates..."),
            StatusMessage::Updated { at } => write!(f, "Rates updated \u{2022} {}", format_clock(*at)),
            StatusMessage::Failed => f.write_str("Failed to update rates"),
            StatusMessage::InvalidData => f.write_str("Invalid rates data"),
            StatusMessage::Empty => f.write_str("Rates empty"),
            StatusMessage::TimedOut => f.write_str("Fetch timed out"),
            StatusMessage::Cancelled => f.write_str("Fetch cancelled"),
        }
    }
}

/// Snapshot of what the currency controls should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateStatus {
    /// Status line.
    pub message: StatusMessage,
    /// Show a busy indicator.
    pub busy: bool,
    /// Currency inputs accept conversions.
    pub controls_enabled: bool,
    /// Last successful update.
    pub last_updated: Option<Timestamp>,
}

impl RateStatus {
    /// Status before any fetch: controls stay disabled until rates load.
    pub fn initial() -> Self {
        Self {
            message: StatusMessage::Ready,
            busy: false,
            controls_enabled: false,
            last_updated: None,
        }
    }

    /// Status while a fetch is outstanding.
    pub fn fetching(last_updated: Option<Timestamp>) -> Self {
        Self {
            message: StatusMessage::Fetching,
            busy: true,
            controls_enabled: false,
            last_updated,
        }
    }

    /// Status after a fetch finished, whatever the result.
    pub fn settled(message: StatusMessage, last_updated: Option<Timestamp>) -> Self {
        Self {
            message,
            busy: false,
            controls_enabled: true,
            last_updated,
        }
    }
}

impl Default for RateStatus {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_texts() {
        assert_eq!(StatusMessage::Fetching.to_string(), "Fetching rates...");
        assert_eq!(StatusMessage::Failed.to_string(), "Failed to update rates");
        assert_eq!(StatusMessage::InvalidData.to_string(), "Invalid rates data");
        assert_eq!(StatusMessage::Empty.to_string(), "Rates empty");
        assert_eq!(StatusMessage::TimedOut.to_string(), "Fetch timed out");

        let updated = StatusMessage::Updated { at: multiconv_common::now() }.to_string();
        assert!(updated.starts_with("Rates updated \u{2022} "));
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(StatusMessage::from(&FxError::Network("x".into())), StatusMessage::Failed);
        assert_eq!(StatusMessage::from(&FxError::Http { status: 500 }), StatusMessage::Failed);
        assert_eq!(StatusMessage::from(&FxError::Parse("x".into())), StatusMessage::InvalidData);
        assert_eq!(StatusMessage::from(&FxError::EmptyRates), StatusMessage::Empty);
        assert_eq!(
            StatusMessage::from(&FxError::Timeout(Duration::from_secs(8))),
            StatusMessage::TimedOut
        );
    }

    #[test]
    fn test_status_flags() {
        let initial = RateStatus::initial();
        assert!(!initial.busy && !initial.controls_enabled);

        let fetching = RateStatus::fetching(None);
        assert!(fetching.busy && !fetching.controls_enabled);

        let settled = RateStatus::settled(StatusMessage::Failed, None);
        assert!(!settled.busy && settled.controls_enabled);
        assert!(settled.message.is_failure());
    }
}
