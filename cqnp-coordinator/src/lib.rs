//! # CQNP Coordinator
//!
//! The coordinator (hospital) role of the Coverage Quote Negotiation
//! Protocol: anchor a coverage estimation, solicit quotes from a set of
//! counterparties concurrently, accept the best offer, reject the rest,
//! and commit the agreement to the ledger with the winner's co-signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cqnp_core::{
//!     CoverageEstimation, Currency, InMemoryDirectory, InMemoryLedger, Money, PartyId,
//! };
//! use cqnp_coordinator::NegotiationCoordinator;
//!
//! # async fn run() -> cqnp_core::CqnpResult<()> {
//! let mut directory = InMemoryDirectory::new();
//! let _listener = directory.register(PartyId::new("insurer-1"));
//! // Hand the listener to a responder host, then negotiate:
//! let coordinator = NegotiationCoordinator::new(
//!     PartyId::new("hospital"),
//!     Arc::new(directory),
//!     Arc::new(InMemoryLedger::new()),
//! );
//!
//! let estimation = CoverageEstimation::new(
//!     "appendectomy",
//!     Money::new("1000".parse().unwrap(), Currency::Usd),
//! );
//! let agreement = coordinator
//!     .run_negotiation(estimation, &[PartyId::new("insurer-1")])
//!     .await?;
//! println!("committed as {}", agreement.finalized.reference);
//! # Ok(())
//! # }
//! ```

mod collector;
mod config;
mod coordinator;
mod session;

pub use collector::{collect_quotes, QuoteExchange};
pub use config::CoordinatorConfig;
pub use coordinator::{CommittedAgreement, NegotiationCoordinator};
pub use session::NegotiationSession;
