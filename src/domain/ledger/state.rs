//! Ledger entry settlement state machine.
//!
//! `Pending -> Scheduled -> Settled` is the happy path. A failed payout
//! releases the entry back to `Pending` until retries are exhausted, after
//! which it parks in `Failed` for manual remediation. `Settled` and
//! `Failed` are terminal.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Settlement state of a commission ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Recorded, waiting out the cool-down window.
    Pending,

    /// Reserved by a settlement cycle; a payout is being arranged.
    Scheduled,

    /// Paid out and confirmed. Immutable forever.
    Settled,

    /// Retries exhausted or terminally rejected; needs manual intervention.
    Failed,
}

impl EntryState {
    /// Returns true if the entry still counts as outstanding money owed.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, EntryState::Pending | EntryState::Scheduled)
    }
}

impl StateMachine for EntryState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use EntryState::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Scheduled)
                | (Pending, Failed)
            // From SCHEDULED
                | (Scheduled, Settled)
                | (Scheduled, Pending) // Failed payout, retry budget left
                | (Scheduled, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use EntryState::*;
        match self {
            Pending => vec![Scheduled, Failed],
            Scheduled => vec![Settled, Pending, Failed],
            Settled => vec![],
            Failed => vec![],
        }
    }
}

impl std::fmt::Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryState::Pending => "pending",
            EntryState::Scheduled => "scheduled",
            EntryState::Settled => "settled",
            EntryState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
