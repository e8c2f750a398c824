//! Time utilities and timing constants.

use chrono::{DateTime, Local, Utc};

/// Rate fetch timing constants.
pub mod constants {
    use std::time::Duration;

    /// Time allowed for a rate fetch before it is abandoned (8 seconds).
    pub const fn fetch_timeout() -> Duration {
        Duration::from_millis(8000)
    }

    /// Interval between proactive background refreshes (1 hour).
    pub const fn refresh_interval() -> Duration {
        Duration::from_secs(3600)
    }
}

/// A timestamp with timezone (always UTC internally).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Render a timestamp as a local wall-clock time, `HH:MM:SS`.
pub fn format_clock(timestamp: Timestamp) -> String {
    timestamp.with_timezone(&Local).format("%H:%M:%S").to_string()
}
