//! Identifier types for multiconv entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a single rate fetch attempt.
/// Uses UUID v7 so ids sort in the order fetches were started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FetchId(Uuid);

impl FetchId {
    /// Create a new fetch ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

}

impl Default for FetchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FetchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
