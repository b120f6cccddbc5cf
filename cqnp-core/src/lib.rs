//! # CQNP Core
//!
//! Shared library for the Coverage Quote Negotiation Protocol (CQNP).
//!
//! In CQNP a coordinator (a hospital) fans one coverage estimation out to a
//! set of counterparties (insurers), collects their quotes concurrently,
//! accepts the highest offer, rejects the rest, and anchors the resulting
//! agreement on a consensus ledger co-signed by the winner.
//!
//! This crate holds everything both sides of the wire share:
//!
//! - message envelope and payload types ([`message`])
//! - money and treatment record models ([`money`], [`record`])
//! - record and session lifecycle state machines ([`state`])
//! - winner selection ([`selection`])
//! - the channel, directory and ledger abstractions with in-process
//!   baselines ([`channel`], [`directory`], [`ledger`])
//!
//! The coordinator and responder roles live in their own crates on top of
//! these types.

pub mod channel;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod message;
pub mod money;
pub mod record;
pub mod selection;
pub mod state;

pub use channel::{Channel, InProcChannel};
pub use directory::{IdentityDirectory, InMemoryDirectory, SessionListener};
pub use error::{
    ChannelError, CollectionError, CommitError, CqnpError, CqnpResult, InvalidQuoteReason,
};
pub use ledger::{ConsensusLedger, FinalizedRecord, InMemoryLedger, RecordRef};
pub use message::{
    CoverageEstimation, Envelope, PartyId, Payload, PayloadKind, Quote, QuoteDecision,
};
pub use money::{Currency, Money};
pub use record::{TreatmentRecord, WinningQuote};
pub use selection::{select_winner, Selection};
pub use state::{RecordStatus, SessionState};

/// Protocol version carried in every message envelope.
pub const PROTOCOL_VERSION: &str = "0.1";
