//! # CQNP Responder
//!
//! The counterparty (insurer) role of the Coverage Quote Negotiation
//! Protocol: answer an estimation request with a quote, then follow the
//! coordinator's verdict through to rejection or a co-signed commit.
//!
//! [`Responder`] holds the negotiation logic behind pluggable
//! [`PricingStrategy`] and [`EligibilityPolicy`] seams; [`ResponderHost`]
//! runs it against every session accepted from a directory listener.

pub mod eligibility;
pub mod host;
pub mod pricing;
pub mod responder;

pub use eligibility::{AcceptAllPolicy, EligibilityPolicy, ExclusionListPolicy};
pub use host::ResponderHost;
pub use pricing::{FixedQuotePricing, PricingStrategy, RandomPercentPricing};
pub use responder::{Responder, SessionOutcome};
