//! End-to-end negotiation demo: one hospital, three insurers, one round.
//!
//! Run with: cargo run --example negotiation

use std::sync::Arc;
use std::time::Duration;

use cqnp_core::{
    CoverageEstimation, CqnpResult, Currency, InMemoryDirectory, InMemoryLedger, Money, PartyId,
};
use cqnp_coordinator::{CoordinatorConfig, NegotiationCoordinator};
use cqnp_responder::{RandomPercentPricing, Responder, ResponderHost};
use rust_decimal_macros::dec;

#[tokio::main]
async fn main() -> CqnpResult<()> {
    tracing_subscriber::fmt::init();

    let insurers = [
        PartyId::new("acme-health"),
        PartyId::new("medicover"),
        PartyId::new("united-care"),
    ];

    let mut directory = InMemoryDirectory::new();
    for insurer in &insurers {
        let listener = directory.register(insurer.clone());
        let responder = Responder::new(insurer.clone(), Box::new(RandomPercentPricing::default()));
        tokio::spawn(ResponderHost::new(responder, listener).run());
    }

    let ledger = Arc::new(InMemoryLedger::new());
    let coordinator = NegotiationCoordinator::with_config(
        PartyId::new("city-hospital"),
        Arc::new(directory),
        ledger,
        CoordinatorConfig::default()
            .with_grace_period(Duration::from_millis(200))
            .with_quote_timeout(Duration::from_secs(5)),
    );

    let estimation = CoverageEstimation::new(
        "appendectomy with two-night stay",
        Money::new(dec!(12500), Currency::Usd),
    );

    let agreement = coordinator.run_negotiation(estimation, &insurers).await?;

    println!("\nwinner   : {}", agreement.winner);
    if let Some(winning) = &agreement.finalized.record.winning_quote {
        println!("coverage : {}", winning.amount);
    }
    println!("anchored : {}", agreement.finalized.reference);

    Ok(())
}
