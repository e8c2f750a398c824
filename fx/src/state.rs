//! Fetch controller state definitions.

use multiconv_common::{Currency, FetchId, Timestamp};

use crate::status::StatusMessage;

/// Fetch lifecycle state. At most one fetch is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    /// No fetch outstanding.
    Idle,
    /// A fetch is outstanding.
    InFlight {
        id: FetchId,
        base: Currency,
        started_at: Timestamp,
    },
}

impl FetchState {
    /// Check if a fetch is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, FetchState::InFlight { .. })
    }

    /// Id of the outstanding fetch.
    pub fn in_flight_id(&self) -> Option<FetchId> {
        match self {
            FetchState::InFlight { id, .. } => Some(*id),
            FetchState::Idle => None,
        }
    }
}

/// Result of asking for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new fetch was started.
    Started(FetchId),
    /// A fetch was already outstanding; nothing was issued.
    AlreadyInFlight(FetchId),
    /// The controller has been shut down.
    ShutDown,
    /// Called outside a Tokio runtime, so there is nothing to run the fetch.
    NoRuntime,
}

impl RefreshOutcome {
    /// Id of the fetch that will deliver fresh rates, if one is running.
    pub fn fetch_id(&self) -> Option<FetchId> {
        match self {
            RefreshOutcome::Started(id) | RefreshOutcome::AlreadyInFlight(id) => Some(*id),
            RefreshOutcome::ShutDown | RefreshOutcome::NoRuntime => None,
        }
    }

    /// Whether this call issued a request.
    pub fn started(&self) -> bool {
        matches!(self, RefreshOutcome::Started(_))
    }

    /// Whether fresh rates are on their way.
    pub fn is_pending(&self) -> bool {
        self.fetch_id().is_some()
    }
}

/// What happened when a fetch result was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The result belonged to the in-flight fetch and was applied.
    Applied(StatusMessage),
    /// The result belonged to a fetch that already finished; ignored.
    Stale,
}

impl Completion {
    /// Whether the result changed controller state.
    pub fn was_applied(&self) -> bool {
        matches!(self, Completion::Applied(_))
    }
}
