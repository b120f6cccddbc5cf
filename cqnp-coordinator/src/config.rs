//! Coordinator timing configuration.

use std::time::Duration;

/// Timing policy for one negotiation round.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Pause between anchoring the estimation and fanning out requests,
    /// giving counterparties time to observe the anchored record.
    pub grace_period: Duration,
    /// How long each counterparty gets to answer an estimation request.
    pub quote_timeout: Duration,
    /// How long the winner gets to approve the commit proposal.
    pub commit_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(10),
            quote_timeout: Duration::from_secs(30),
            commit_timeout: Duration::from_secs(30),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_quote_timeout(mut self, quote_timeout: Duration) -> Self {
        self.quote_timeout = quote_timeout;
        self
    }

    pub fn with_commit_timeout(mut self, commit_timeout: Duration) -> Self {
        self.commit_timeout = commit_timeout;
        self
    }
}
