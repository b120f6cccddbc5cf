//! Abstract consensus ledger anchoring record versions.
//!
//! The negotiation core never talks to a real distributed ledger; it
//! proposes record versions through [`ConsensusLedger`] and treats a
//! rejected proposal as a failed commit. [`InMemoryLedger`] provides
//! single-process semantics with the one property the protocol relies on:
//! a record version can be consumed as a transition input at most once.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::CommitError;
use crate::message::PartyId;
use crate::record::TreatmentRecord;

/// Opaque reference to one finalized record version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef(Uuid);

impl RecordRef {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record version the ledger has accepted, with the parties that signed
/// the proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedRecord {
    pub reference: RecordRef,
    pub record: TreatmentRecord,
    pub signers: Vec<PartyId>,
}

/// Anchors record versions and enforces linear history per record.
#[async_trait]
pub trait ConsensusLedger: Send + Sync {
    /// Anchor the first version of a record, signed by the proposer alone.
    async fn propose_initial_record(
        &self,
        record: TreatmentRecord,
        proposer: PartyId,
    ) -> Result<FinalizedRecord, CommitError>;

    /// Consume `input` and anchor `output` in its place, signed by every
    /// party in `signers`. Fails with [`CommitError::Conflict`] when the
    /// input version is unknown or already superseded.
    async fn propose_transition(
        &self,
        input: RecordRef,
        output: TreatmentRecord,
        signers: Vec<PartyId>,
    ) -> Result<FinalizedRecord, CommitError>;
}

/// Single-process ledger baseline.
#[derive(Default)]
pub struct InMemoryLedger {
    live: Mutex<HashMap<RecordRef, FinalizedRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live (not yet superseded) record version.
    pub async fn get(&self, reference: &RecordRef) -> Option<FinalizedRecord> {
        self.live.lock().await.get(reference).cloned()
    }
}

#[async_trait]
impl ConsensusLedger for InMemoryLedger {
    async fn propose_initial_record(
        &self,
        record: TreatmentRecord,
        proposer: PartyId,
    ) -> Result<FinalizedRecord, CommitError> {
        let finalized = FinalizedRecord {
            reference: RecordRef::generate(),
            record,
            signers: vec![proposer],
        };
        self.live
            .lock()
            .await
            .insert(finalized.reference, finalized.clone());
        Ok(finalized)
    }

    async fn propose_transition(
        &self,
        input: RecordRef,
        output: TreatmentRecord,
        signers: Vec<PartyId>,
    ) -> Result<FinalizedRecord, CommitError> {
        let mut live = self.live.lock().await;
        // Consuming the input atomically is what makes double-commits of
        // one estimation impossible.
        if live.remove(&input).is_none() {
            return Err(CommitError::Conflict(input));
        }
        let finalized = FinalizedRecord {
            reference: RecordRef::generate(),
            record: output,
            signers,
        };
        live.insert(finalized.reference, finalized.clone());
        Ok(finalized)
    }
}
