//! Quote pricing strategies.
//!
//! The responder delegates "how much do we cover" to a [`PricingStrategy`]
//! so hosts can plug in real underwriting. [`RandomPercentPricing`] is the
//! built-in baseline: it offers a uniformly random percentage of the
//! estimated cost, in the estimation's own currency.

use rand::Rng;
use rust_decimal::Decimal;

use cqnp_core::{CoverageEstimation, Money};

/// Prices one coverage estimation into an offer amount.
///
/// Implementations must be pure with respect to the session: the same
/// strategy instance is shared across concurrent sessions.
pub trait PricingStrategy: Send + Sync {
    fn price(&self, estimation: &CoverageEstimation) -> Money;
}

/// Offers a uniformly random percentage of the estimated cost.
pub struct RandomPercentPricing {
    min_percent: u32,
    max_percent: u32,
}

impl RandomPercentPricing {
    /// Bounds are inclusive and may exceed 100 for over-cover offers.
    pub fn new(min_percent: u32, max_percent: u32) -> Self {
        Self {
            min_percent: min_percent.min(max_percent),
            max_percent: min_percent.max(max_percent),
        }
    }
}

impl Default for RandomPercentPricing {
    fn default() -> Self {
        Self::new(0, 100)
    }
}

impl PricingStrategy for RandomPercentPricing {
    fn price(&self, estimation: &CoverageEstimation) -> Money {
        let percent = rand::thread_rng().gen_range(self.min_percent..=self.max_percent);
        let amount = (estimation.estimated_amount.amount * Decimal::from(percent)
            / Decimal::ONE_HUNDRED)
            .round_dp(2);
        Money::new(amount, estimation.estimated_amount.currency)
    }
}

/// Always offers the same amount, whatever the estimation says.
///
/// Intended for tests and demos that need deterministic quotes.
pub struct FixedQuotePricing {
    amount: Money,
}

impl FixedQuotePricing {
    pub fn new(amount: Money) -> Self {
        Self { amount }
    }
}

impl PricingStrategy for FixedQuotePricing {
    fn price(&self, _estimation: &CoverageEstimation) -> Money {
        self.amount
    }
}
