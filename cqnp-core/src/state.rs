//! Lifecycle state machines for records and counterparty sessions.
//!
//! Both machines are plain enums with an explicit transition table; callers
//! check `can_transition_to` before mutating anything so an out-of-order
//! message can never push a record or session into an illegal state.

use serde::{Deserialize, Serialize};

/// Lifecycle of a [`TreatmentRecord`](crate::record::TreatmentRecord).
///
/// This crate drives `Estimated -> Quoted` itself; `Committed` is applied by
/// ledger finalization and `Settled` belongs to downstream claim settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Estimated,
    Quoted,
    Committed,
    Settled,
}

impl RecordStatus {
    pub fn valid_transitions(&self) -> Vec<RecordStatus> {
        match self {
            Self::Estimated => vec![Self::Quoted],
            Self::Quoted => vec![Self::Committed],
            Self::Committed => vec![Self::Settled],
            Self::Settled => vec![],
        }
    }

    pub fn can_transition_to(&self, next: &RecordStatus) -> bool {
        self.valid_transitions().contains(next)
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

/// Counterparty-side lifecycle of one negotiation session.
///
/// A session that received `Rejected` ends in `Rejected`; `Failed` covers
/// channel loss and malformed traffic at any non-terminal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingEstimation,
    OfferSent,
    AwaitingCommit,
    Committed,
    Rejected,
    Failed,
}

impl SessionState {
    pub fn valid_transitions(&self) -> Vec<SessionState> {
        match self {
            Self::AwaitingEstimation => vec![Self::OfferSent, Self::Failed],
            Self::OfferSent => vec![Self::AwaitingCommit, Self::Rejected, Self::Failed],
            Self::AwaitingCommit => vec![Self::Committed, Self::Failed],
            Self::Committed | Self::Rejected | Self::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        self.valid_transitions().contains(next)
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
