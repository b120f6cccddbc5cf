//! Message types for the CQNP wire protocol.
//!
//! One negotiation session carries heterogeneous payloads (estimation
//! request, quote offer, decision, commit exchange) over a single channel,
//! so every message is an [`Envelope`] around the [`Payload`] tagged union.
//! The `kind` discriminant is explicit on the wire; receivers decode by
//! expected-type context through the typed `into_*` accessors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{CqnpError, CqnpResult, InvalidQuoteReason};
use crate::money::Money;
use crate::record::TreatmentRecord;

/// Logical identity of a negotiation participant (coordinator or
/// counterparty). Routing to an endpoint is the directory's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyId(String);

impl PartyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable description of the pending treatment and its estimated cost.
///
/// Created once by the coordinator before any negotiation starts and passed
/// by value to every counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageEstimation {
    pub treatment_description: String,
    pub estimated_amount: Money,
}

impl CoverageEstimation {
    pub fn new(treatment_description: impl Into<String>, estimated_amount: Money) -> Self {
        Self {
            treatment_description: treatment_description.into(),
            estimated_amount,
        }
    }

    /// A negotiation may only start from a well-formed estimation.
    pub fn validate(&self) -> CqnpResult<()> {
        if self.treatment_description.trim().is_empty() {
            return Err(CqnpError::Validation(
                "treatment description must not be empty".to_string(),
            ));
        }
        if !self.estimated_amount.is_positive() {
            return Err(CqnpError::Validation(format!(
                "estimated amount must be positive, got {}",
                self.estimated_amount
            )));
        }
        Ok(())
    }
}

/// A priced offer from one counterparty for one negotiation round.
///
/// Immutable once received; re-querying a counterparty mid-round is not part
/// of this protocol version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub counterparty: PartyId,
    pub amount: Money,
}

impl Quote {
    pub fn new(counterparty: PartyId, amount: Money) -> Self {
        Self {
            counterparty,
            amount,
        }
    }

    /// Check this quote against the estimation it answers.
    ///
    /// Amounts must be non-negative (zero is a valid offer) and denominated
    /// in the estimation's currency; cross-currency quotes are rejected, not
    /// compared.
    pub fn validate_against(
        &self,
        estimation: &CoverageEstimation,
    ) -> Result<(), InvalidQuoteReason> {
        if self.amount.is_negative() {
            return Err(InvalidQuoteReason::NegativeAmount(self.amount));
        }
        if !self.amount.same_currency(&estimation.estimated_amount) {
            return Err(InvalidQuoteReason::CurrencyMismatch {
                expected: estimation.estimated_amount.currency,
                got: self.amount.currency,
            });
        }
        Ok(())
    }
}

/// Verdict delivered to each valid-quoting counterparty, exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteDecision {
    Accepted,
    Rejected,
}

/// Discriminant of a [`Payload`], used in expected-vs-got error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    EstimationRequest,
    QuoteOffer,
    Decision,
    CommitProposal,
    CommitApproval,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EstimationRequest => "estimation_request",
            Self::QuoteOffer => "quote_offer",
            Self::Decision => "decision",
            Self::CommitProposal => "commit_proposal",
            Self::CommitApproval => "commit_approval",
        };
        write!(f, "{}", name)
    }
}

/// The tagged union of everything a negotiation session can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// Coordinator → counterparty: solicit a quote for this estimation.
    EstimationRequest { estimation: CoverageEstimation },
    /// Counterparty → coordinator: the priced offer.
    QuoteOffer { quote: Quote },
    /// Coordinator → counterparty: accepted or rejected.
    Decision { decision: QuoteDecision },
    /// Coordinator → winner: proposed next version of the record.
    CommitProposal { record: TreatmentRecord },
    /// Winner → coordinator: co-sign or refuse the proposal.
    CommitApproval {
        approved: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::EstimationRequest { .. } => PayloadKind::EstimationRequest,
            Self::QuoteOffer { .. } => PayloadKind::QuoteOffer,
            Self::Decision { .. } => PayloadKind::Decision,
            Self::CommitProposal { .. } => PayloadKind::CommitProposal,
            Self::CommitApproval { .. } => PayloadKind::CommitApproval,
        }
    }

    pub fn into_estimation(self) -> CqnpResult<CoverageEstimation> {
        match self {
            Self::EstimationRequest { estimation } => Ok(estimation),
            other => Err(Self::malformed(PayloadKind::EstimationRequest, &other)),
        }
    }

    pub fn into_quote(self) -> CqnpResult<Quote> {
        match self {
            Self::QuoteOffer { quote } => Ok(quote),
            other => Err(Self::malformed(PayloadKind::QuoteOffer, &other)),
        }
    }

    pub fn into_decision(self) -> CqnpResult<QuoteDecision> {
        match self {
            Self::Decision { decision } => Ok(decision),
            other => Err(Self::malformed(PayloadKind::Decision, &other)),
        }
    }

    pub fn into_commit_proposal(self) -> CqnpResult<TreatmentRecord> {
        match self {
            Self::CommitProposal { record } => Ok(record),
            other => Err(Self::malformed(PayloadKind::CommitProposal, &other)),
        }
    }

    pub fn into_commit_approval(self) -> CqnpResult<(bool, Option<String>)> {
        match self {
            Self::CommitApproval { approved, reason } => Ok((approved, reason)),
            other => Err(Self::malformed(PayloadKind::CommitApproval, &other)),
        }
    }

    fn malformed(expected: PayloadKind, got: &Payload) -> CqnpError {
        CqnpError::MalformedRequest {
            expected,
            got: got.kind(),
        }
    }
}

/// Wire envelope around every payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub protocol_version: String,
    pub message_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<Uuid>,
    /// Groups all messages of one negotiation round.
    pub negotiation_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub sender: PartyId,
    pub payload: Payload,
}

impl Envelope {
    /// Create a fresh message within a negotiation round.
    pub fn new(sender: PartyId, negotiation_id: Uuid, payload: Payload) -> Self {
        Self {
            protocol_version: crate::PROTOCOL_VERSION.to_string(),
            message_id: Uuid::new_v4(),
            in_response_to: None,
            negotiation_id,
            timestamp: Utc::now(),
            sender,
            payload,
        }
    }

    /// Create a message answering a previous one in the same round.
    pub fn reply(previous: &Envelope, sender: PartyId, payload: Payload) -> Self {
        Self {
            protocol_version: crate::PROTOCOL_VERSION.to_string(),
            message_id: Uuid::new_v4(),
            in_response_to: Some(previous.message_id),
            negotiation_id: previous.negotiation_id,
            timestamp: Utc::now(),
            sender,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use rust_decimal_macros::dec;

    fn sample_estimation() -> CoverageEstimation {
        CoverageEstimation::new(
            "appendectomy",
            Money::new(dec!(1000), Currency::Usd),
        )
    }

    #[test]
    fn envelope_serialization() {
        let env = Envelope::new(
            PartyId::new("hospital-1"),
            Uuid::new_v4(),
            Payload::EstimationRequest {
                estimation: sample_estimation(),
            },
        );

        let json = serde_json::to_string_pretty(&env).unwrap();
        assert!(json.contains("\"protocol_version\": \"0.1\""));
        assert!(json.contains("\"kind\": \"estimation_request\""));
        assert!(json.contains("appendectomy"));

        let parsed: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, env);
    }

    #[test]
    fn reply_threads_the_round() {
        let request = Envelope::new(
            PartyId::new("hospital-1"),
            Uuid::new_v4(),
            Payload::EstimationRequest {
                estimation: sample_estimation(),
            },
        );
        let quote = Quote::new(
            PartyId::new("insurer-1"),
            Money::new(dec!(700), Currency::Usd),
        );
        let reply = Envelope::reply(&request, PartyId::new("insurer-1"), Payload::QuoteOffer {
            quote,
        });

        assert_eq!(reply.in_response_to, Some(request.message_id));
        assert_eq!(reply.negotiation_id, request.negotiation_id);
    }

    #[test]
    fn decision_serialization() {
        assert_eq!(
            serde_json::to_string(&QuoteDecision::Accepted).unwrap(),
            "\"ACCEPTED\""
        );
        assert_eq!(
            serde_json::to_string(&QuoteDecision::Rejected).unwrap(),
            "\"REJECTED\""
        );
    }

    #[test]
    fn estimation_validation() {
        assert!(sample_estimation().validate().is_ok());

        let empty = CoverageEstimation::new("  ", Money::new(dec!(1000), Currency::Usd));
        assert!(matches!(empty.validate(), Err(CqnpError::Validation(_))));

        let zero = CoverageEstimation::new("scan", Money::new(dec!(0), Currency::Usd));
        assert!(matches!(zero.validate(), Err(CqnpError::Validation(_))));
    }

    #[test]
    fn quote_validation() {
        let est = sample_estimation();

        let ok = Quote::new(PartyId::new("i1"), Money::new(dec!(0), Currency::Usd));
        assert!(ok.validate_against(&est).is_ok());

        let negative = Quote::new(PartyId::new("i1"), Money::new(dec!(-1), Currency::Usd));
        assert!(matches!(
            negative.validate_against(&est),
            Err(InvalidQuoteReason::NegativeAmount(_))
        ));

        let eur = Quote::new(PartyId::new("i1"), Money::new(dec!(500), Currency::Eur));
        assert!(matches!(
            eur.validate_against(&est),
            Err(InvalidQuoteReason::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn typed_accessors_enforce_expectation() {
        let payload = Payload::Decision {
            decision: QuoteDecision::Accepted,
        };
        assert_eq!(payload.kind(), PayloadKind::Decision);

        let err = payload.into_quote().unwrap_err();
        match err {
            CqnpError::MalformedRequest { expected, got } => {
                assert_eq!(expected, PayloadKind::QuoteOffer);
                assert_eq!(got, PayloadKind::Decision);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
