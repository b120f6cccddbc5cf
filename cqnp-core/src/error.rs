//! Error taxonomy for the negotiation protocol.
//!
//! Per-counterparty collection failures ([`CollectionError`]) are recoverable
//! and never abort a round; everything that surfaces as [`CqnpError`] from
//! the coordinator is fatal to the round that raised it.

use std::time::Duration;
use thiserror::Error;

use crate::ledger::RecordRef;
use crate::message::{PartyId, PayloadKind};
use crate::money::{Currency, Money};

/// Failure of a single send or receive on a message channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("channel closed by peer")]
    Closed,
}

/// Why a received quote was excluded from selection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidQuoteReason {
    #[error("quote amount {0} is negative")]
    NegativeAmount(Money),
    #[error("quote currency {got} does not match estimation currency {expected}")]
    CurrencyMismatch { expected: Currency, got: Currency },
    #[error("expected a quote offer, got {0}")]
    UnexpectedPayload(PayloadKind),
}

/// Why one counterparty contributed no quote to a round.
///
/// Recorded per counterparty and logged; the round continues with whatever
/// valid quotes remain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    #[error("no quote within {0:?}")]
    Timeout(Duration),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid quote: {0}")]
    InvalidQuote(#[from] InvalidQuoteReason),
}

impl From<ChannelError> for CollectionError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Timeout(duration) => Self::Timeout(duration),
            ChannelError::Transport(detail) => Self::Transport(detail),
            ChannelError::Closed => Self::Transport("channel closed by peer".to_string()),
        }
    }
}

/// Failure of the two-party commit with the winning counterparty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("{party} refused to co-sign: {reason}")]
    SignerRefused { party: PartyId, reason: String },
    #[error("ledger conflict on input record {0}")]
    Conflict(RecordRef),
    #[error("commit exchange failed: {0}")]
    Exchange(#[from] ChannelError),
}

/// Top-level error type for CQNP operations.
#[derive(Error, Debug)]
pub enum CqnpError {
    /// A message arrived that the protocol does not allow at this point.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Input rejected before any counterparty was contacted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A structurally valid envelope carried the wrong payload kind.
    #[error("malformed message: expected {expected}, got {got}")]
    MalformedRequest {
        expected: PayloadKind,
        got: PayloadKind,
    },

    /// Every counterparty timed out, failed, or quoted invalidly.
    #[error("no valid quotes available")]
    NoQuotesAvailable,

    #[error("commit failed: {0}")]
    Commit(#[from] CommitError),

    #[error("channel failure: {0}")]
    Channel(#[from] ChannelError),
}

pub type CqnpResult<T> = Result<T, CqnpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn error_display() {
        let err = CqnpError::MalformedRequest {
            expected: PayloadKind::QuoteOffer,
            got: PayloadKind::Decision,
        };
        assert_eq!(
            err.to_string(),
            "malformed message: expected quote_offer, got decision"
        );

        let refused = CommitError::SignerRefused {
            party: PartyId::new("insurer-1"),
            reason: "record does not match the offer".to_string(),
        };
        assert_eq!(
            refused.to_string(),
            "insurer-1 refused to co-sign: record does not match the offer"
        );
    }

    #[test]
    fn channel_errors_map_into_collection_errors() {
        let timeout: CollectionError = ChannelError::Timeout(Duration::from_secs(30)).into();
        assert_eq!(timeout, CollectionError::Timeout(Duration::from_secs(30)));

        let closed: CollectionError = ChannelError::Closed.into();
        assert!(matches!(closed, CollectionError::Transport(_)));
    }

    #[test]
    fn invalid_quote_reason_display() {
        let reason = InvalidQuoteReason::CurrencyMismatch {
            expected: Currency::Usd,
            got: Currency::Eur,
        };
        assert_eq!(
            reason.to_string(),
            "quote currency EUR does not match estimation currency USD"
        );

        let negative =
            InvalidQuoteReason::NegativeAmount(Money::new(dec!(-5), Currency::Usd));
        assert_eq!(negative.to_string(), "quote amount -5 USD is negative");
    }
}
