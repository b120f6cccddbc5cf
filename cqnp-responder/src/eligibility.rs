//! Coverage eligibility policies.
//!
//! Eligibility is advisory in this protocol version: the wire format has no
//! decline message, so a responder that considers a treatment uncovered
//! still quotes (typically low) and the check only drives logging. Hosts
//! that want hard declines should price uncovered treatments at zero.

use cqnp_core::CoverageEstimation;

/// Decides whether a treatment falls under this counterparty's coverage.
pub trait EligibilityPolicy: Send + Sync {
    fn is_covered(&self, estimation: &CoverageEstimation) -> bool;
}

/// Considers every treatment covered.
pub struct AcceptAllPolicy;

impl EligibilityPolicy for AcceptAllPolicy {
    fn is_covered(&self, _estimation: &CoverageEstimation) -> bool {
        true
    }
}

/// Declines treatments whose description mentions an excluded term.
///
/// Matching is case-insensitive substring search over the description.
pub struct ExclusionListPolicy {
    excluded_terms: Vec<String>,
}

impl ExclusionListPolicy {
    pub fn new(excluded_terms: Vec<String>) -> Self {
        Self {
            excluded_terms: excluded_terms
                .into_iter()
                .map(|term| term.to_lowercase())
                .collect(),
        }
    }
}

impl EligibilityPolicy for ExclusionListPolicy {
    fn is_covered(&self, estimation: &CoverageEstimation) -> bool {
        let description = estimation.treatment_description.to_lowercase();
        !self
            .excluded_terms
            .iter()
            .any(|term| description.contains(term))
    }
}
