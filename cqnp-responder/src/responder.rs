//! The counterparty session driver.
//!
//! A [`Responder`] drives exactly one negotiation session per channel:
//! receive the estimation, quote it, wait for the verdict, and if accepted
//! co-sign the commit proposal. Waits are unbounded on this side; the
//! coordinator controls the pacing of the round and drops the channel when
//! it gives up on us.

use cqnp_core::{
    Channel, CoverageEstimation, CqnpError, CqnpResult, Envelope, PartyId, Payload, Quote,
    QuoteDecision, RecordStatus, SessionState, TreatmentRecord,
};

use crate::eligibility::{AcceptAllPolicy, EligibilityPolicy};
use crate::pricing::PricingStrategy;

/// Terminal result of one fully driven session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// This counterparty won the round and co-signed the committed record.
    Committed(TreatmentRecord),
    /// The coordinator went with another counterparty.
    Rejected,
}

/// One counterparty's negotiation logic, shared across concurrent sessions.
pub struct Responder {
    party: PartyId,
    pricing: Box<dyn PricingStrategy>,
    eligibility: Box<dyn EligibilityPolicy>,
}

impl Responder {
    /// Create a responder that considers every treatment covered.
    pub fn new(party: PartyId, pricing: Box<dyn PricingStrategy>) -> Self {
        Self {
            party,
            pricing,
            eligibility: Box::new(AcceptAllPolicy),
        }
    }

    /// Create a responder with an explicit eligibility policy.
    pub fn with_eligibility(
        party: PartyId,
        pricing: Box<dyn PricingStrategy>,
        eligibility: Box<dyn EligibilityPolicy>,
    ) -> Self {
        Self {
            party,
            pricing,
            eligibility,
        }
    }

    pub fn party(&self) -> &PartyId {
        &self.party
    }

    /// Drive one session over `channel` to its terminal state.
    pub async fn respond(&self, mut channel: Box<dyn Channel>) -> CqnpResult<SessionOutcome> {
        let mut state = SessionState::AwaitingEstimation;

        let request = channel.recv().await?;
        let estimation = request.payload.clone().into_estimation()?;
        tracing::info!(
            "{}: estimation request for \"{}\" at {}",
            self.party,
            estimation.treatment_description,
            estimation.estimated_amount
        );

        if !self.eligibility.is_covered(&estimation) {
            // Advisory only: the protocol has no decline message, so an
            // uncovered treatment still gets a quote.
            tracing::warn!(
                "{}: \"{}\" falls outside coverage, quoting anyway",
                self.party,
                estimation.treatment_description
            );
        }

        let offer = Quote::new(self.party.clone(), self.pricing.price(&estimation));
        if let Err(reason) = offer.validate_against(&estimation) {
            tracing::warn!(
                "{}: pricing produced an offer the coordinator will exclude: {}",
                self.party,
                reason
            );
        }
        let offer_message = Envelope::reply(
            &request,
            self.party.clone(),
            Payload::QuoteOffer {
                quote: offer.clone(),
            },
        );
        channel.send(offer_message).await?;
        self.advance(&mut state, SessionState::OfferSent)?;

        let verdict = channel.recv().await?;
        match verdict.payload.clone().into_decision()? {
            QuoteDecision::Rejected => {
                self.advance(&mut state, SessionState::Rejected)?;
                tracing::info!("{}: offer of {} was rejected", self.party, offer.amount);
                Ok(SessionOutcome::Rejected)
            }
            QuoteDecision::Accepted => {
                self.advance(&mut state, SessionState::AwaitingCommit)?;
                tracing::info!(
                    "{}: offer of {} was accepted, awaiting commit",
                    self.party,
                    offer.amount
                );
                self.co_sign(&mut *channel, &mut state, &estimation, &offer)
                    .await
            }
        }
    }

    /// Receive the commit proposal and approve or refuse it.
    ///
    /// Refusal is fail-closed: any divergence between the proposed record
    /// and what this session actually negotiated blocks the commit.
    async fn co_sign(
        &self,
        channel: &mut dyn Channel,
        state: &mut SessionState,
        estimation: &CoverageEstimation,
        offer: &Quote,
    ) -> CqnpResult<SessionOutcome> {
        let proposal = channel.recv().await?;
        let record = proposal.payload.clone().into_commit_proposal()?;

        if let Err(reason) = verify_proposal(&record, estimation, offer, &self.party) {
            let refusal = Envelope::reply(
                &proposal,
                self.party.clone(),
                Payload::CommitApproval {
                    approved: false,
                    reason: Some(reason.clone()),
                },
            );
            channel.send(refusal).await?;
            self.advance(state, SessionState::Failed)?;
            tracing::error!("{}: refused commit proposal: {}", self.party, reason);
            return Err(CqnpError::Validation(reason));
        }

        let approval = Envelope::reply(
            &proposal,
            self.party.clone(),
            Payload::CommitApproval {
                approved: true,
                reason: None,
            },
        );
        channel.send(approval).await?;
        self.advance(state, SessionState::Committed)?;
        tracing::info!("{}: co-signed record {}", self.party, record.record_id);
        Ok(SessionOutcome::Committed(record))
    }

    fn advance(&self, state: &mut SessionState, next: SessionState) -> CqnpResult<()> {
        if !state.can_transition_to(&next) {
            return Err(CqnpError::Protocol(format!(
                "invalid session transition {:?} -> {:?}",
                state, next
            )));
        }
        tracing::debug!("{}: session {:?} -> {:?}", self.party, state, next);
        *state = next;
        Ok(())
    }
}

fn verify_proposal(
    record: &TreatmentRecord,
    estimation: &CoverageEstimation,
    offer: &Quote,
    party: &PartyId,
) -> Result<(), String> {
    if record.status != RecordStatus::Quoted {
        return Err(format!(
            "proposed record is {:?}, expected quoted",
            record.status
        ));
    }
    if record.treatment_description != estimation.treatment_description {
        return Err("proposed record describes a different treatment".to_string());
    }
    if record.estimated_cost != estimation.estimated_amount {
        return Err(format!(
            "proposed record estimates {}, session negotiated {}",
            record.estimated_cost, estimation.estimated_amount
        ));
    }
    let winning = record
        .winning_quote
        .as_ref()
        .ok_or_else(|| "proposed record carries no winning quote".to_string())?;
    if winning.counterparty != *party {
        return Err(format!(
            "proposed record names {} as winner, not this party",
            winning.counterparty
        ));
    }
    if winning.amount != offer.amount {
        return Err(format!(
            "proposed record books {}, this session offered {}",
            winning.amount, offer.amount
        ));
    }
    Ok(())
}
