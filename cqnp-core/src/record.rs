//! The treatment record negotiated over and anchored on the ledger.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CqnpError, CqnpResult};
use crate::message::{CoverageEstimation, PartyId, Quote};
use crate::money::Money;
use crate::state::RecordStatus;

/// The accepted quote, as recorded on the treatment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinningQuote {
    pub counterparty: PartyId,
    pub amount: Money,
}

impl From<Quote> for WinningQuote {
    fn from(quote: Quote) -> Self {
        Self {
            counterparty: quote.counterparty,
            amount: quote.amount,
        }
    }
}

/// The durable subject of a negotiation.
///
/// Versions of this record are what the ledger anchors: the initial
/// `Estimated` version before fan-out, then the `Quoted` version carrying the
/// winning quote once the two-party commit succeeds. `final_cost` and
/// `amount_paid` are populated by later settlement stages, never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentRecord {
    pub record_id: Uuid,
    pub treatment_description: String,
    pub estimated_cost: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_cost: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_paid: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_quote: Option<WinningQuote>,
    pub status: RecordStatus,
}

impl TreatmentRecord {
    /// Initial `Estimated` version, created before any counterparty is
    /// contacted.
    pub fn estimated(estimation: &CoverageEstimation) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            treatment_description: estimation.treatment_description.clone(),
            estimated_cost: estimation.estimated_amount,
            final_cost: None,
            amount_paid: None,
            winning_quote: None,
            status: RecordStatus::Estimated,
        }
    }

    /// Record the accepted quote and advance to `Quoted`.
    ///
    /// Fails if the record is not in a state that admits a quote, so a
    /// record can never carry two winners.
    pub fn attach_winning_quote(&mut self, quote: Quote) -> CqnpResult<()> {
        if !self.status.can_transition_to(&RecordStatus::Quoted) {
            return Err(CqnpError::Protocol(format!(
                "cannot attach a winning quote to a record in state {:?}",
                self.status
            )));
        }
        self.winning_quote = Some(quote.into());
        self.status = RecordStatus::Quoted;
        Ok(())
    }
}
