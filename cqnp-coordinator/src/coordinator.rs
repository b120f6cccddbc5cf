//! The negotiation round driver.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use cqnp_core::{
    select_winner, CommitError, ConsensusLedger, CoverageEstimation, CqnpError, CqnpResult,
    Envelope, FinalizedRecord, IdentityDirectory, PartyId, Payload, QuoteDecision, RecordRef,
    TreatmentRecord,
};

use crate::collector::collect_quotes;
use crate::config::CoordinatorConfig;
use crate::session::NegotiationSession;

/// Successful end of a negotiation round.
#[derive(Debug, Clone)]
pub struct CommittedAgreement {
    pub negotiation_id: Uuid,
    pub winner: PartyId,
    pub finalized: FinalizedRecord,
}

/// Coordinator (hospital) side of the protocol: anchors the estimation,
/// fans out for quotes, picks the winner, delivers the verdicts, and runs
/// the two-party commit.
pub struct NegotiationCoordinator {
    party: PartyId,
    directory: Arc<dyn IdentityDirectory>,
    ledger: Arc<dyn ConsensusLedger>,
    config: CoordinatorConfig,
}

impl NegotiationCoordinator {
    pub fn new(
        party: PartyId,
        directory: Arc<dyn IdentityDirectory>,
        ledger: Arc<dyn ConsensusLedger>,
    ) -> Self {
        Self::with_config(party, directory, ledger, CoordinatorConfig::default())
    }

    pub fn with_config(
        party: PartyId,
        directory: Arc<dyn IdentityDirectory>,
        ledger: Arc<dyn ConsensusLedger>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            party,
            directory,
            ledger,
            config,
        }
    }

    pub fn party(&self) -> &PartyId {
        &self.party
    }

    /// Run one negotiation round to a committed agreement.
    ///
    /// Per-counterparty failures during collection only shrink the candidate
    /// set. Once a winner is chosen every further failure (unreachable
    /// winner, refused approval, ledger conflict) is fatal; there is no
    /// fallback to the second-best quote.
    pub async fn run_negotiation(
        &self,
        estimation: CoverageEstimation,
        counterparties: &[PartyId],
    ) -> CqnpResult<CommittedAgreement> {
        validate_round(&estimation, counterparties)?;

        let negotiation_id = Uuid::new_v4();
        let mut record = TreatmentRecord::estimated(&estimation);
        tracing::info!(
            "{}: negotiation {} for \"{}\" at {}, {} counterparties",
            self.party,
            negotiation_id,
            estimation.treatment_description,
            estimation.estimated_amount,
            counterparties.len()
        );

        let initial = self
            .ledger
            .propose_initial_record(record.clone(), self.party.clone())
            .await?;
        tracing::debug!(
            "{}: anchored estimation as {}",
            self.party,
            initial.reference
        );

        tokio::time::sleep(self.config.grace_period).await;

        let exchanges = collect_quotes(
            Arc::clone(&self.directory),
            self.party.clone(),
            negotiation_id,
            estimation.clone(),
            counterparties,
            self.config.quote_timeout,
        )
        .await;

        let mut quotes = Vec::new();
        let mut sessions: HashMap<PartyId, NegotiationSession> = HashMap::new();
        for exchange in exchanges {
            match exchange.result {
                Ok(quote) => {
                    tracing::info!(
                        "{}: {} quoted {}",
                        self.party,
                        exchange.counterparty,
                        quote.amount
                    );
                    quotes.push((exchange.counterparty.clone(), quote));
                    if let Some(session) = exchange.session {
                        sessions.insert(exchange.counterparty, session);
                    }
                }
                Err(e) => {
                    tracing::warn!("{}: excluding {}: {}", self.party, exchange.counterparty, e);
                }
            }
        }

        let selection = select_winner(estimation.estimated_amount.currency, &quotes)?;
        for party in &selection.excluded {
            tracing::warn!("{}: {} excluded at selection", self.party, party);
        }
        let (winner, winning_quote) = selection.winner.clone();
        tracing::info!(
            "{}: selected {} at {}, rejecting {} others",
            self.party,
            winner,
            winning_quote.amount,
            selection.losers.len()
        );

        // Losers are notified off the critical path; a dead loser channel
        // must not delay the winner's commit.
        for loser in &selection.losers {
            if let Some(mut session) = sessions.remove(loser) {
                let decision = Envelope::new(
                    self.party.clone(),
                    negotiation_id,
                    Payload::Decision {
                        decision: QuoteDecision::Rejected,
                    },
                );
                let coordinator = self.party.clone();
                tokio::spawn(async move {
                    if let Err(e) = session.send(decision).await {
                        tracing::warn!(
                            "{}: could not deliver rejection to {}: {}",
                            coordinator,
                            session.counterparty(),
                            e
                        );
                    }
                });
            }
        }

        let mut winner_session = sessions
            .remove(&winner)
            .ok_or_else(|| CqnpError::Protocol(format!("no live session for winner {}", winner)))?;

        let accept = Envelope::new(
            self.party.clone(),
            negotiation_id,
            Payload::Decision {
                decision: QuoteDecision::Accepted,
            },
        );
        winner_session.send(accept).await?;

        record.attach_winning_quote(winning_quote)?;
        let finalized = self
            .commit_with_winner(&mut winner_session, negotiation_id, initial.reference, record)
            .await?;

        tracing::info!(
            "{}: negotiation {} committed as {}",
            self.party,
            negotiation_id,
            finalized.reference
        );

        Ok(CommittedAgreement {
            negotiation_id,
            winner,
            finalized,
        })
    }

    /// Two-party commit: propose the quoted record to the winner, collect
    /// its approval, then anchor the transition with both signatures.
    async fn commit_with_winner(
        &self,
        session: &mut NegotiationSession,
        negotiation_id: Uuid,
        input: RecordRef,
        record: TreatmentRecord,
    ) -> CqnpResult<FinalizedRecord> {
        let proposal = Envelope::new(
            self.party.clone(),
            negotiation_id,
            Payload::CommitProposal {
                record: record.clone(),
            },
        );
        let response = session
            .request(proposal, self.config.commit_timeout)
            .await
            .map_err(CommitError::Exchange)?;

        let (approved, reason) = response.payload.into_commit_approval()?;
        if !approved {
            let reason = reason.unwrap_or_else(|| "no reason given".to_string());
            return Err(CommitError::SignerRefused {
                party: session.counterparty().clone(),
                reason,
            }
            .into());
        }

        let finalized = self
            .ledger
            .propose_transition(
                input,
                record,
                vec![self.party.clone(), session.counterparty().clone()],
            )
            .await?;
        Ok(finalized)
    }
}

fn validate_round(estimation: &CoverageEstimation, counterparties: &[PartyId]) -> CqnpResult<()> {
    estimation.validate()?;
    if counterparties.is_empty() {
        return Err(CqnpError::Validation(
            "at least one counterparty is required".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for party in counterparties {
        if !seen.insert(party) {
            return Err(CqnpError::Validation(format!(
                "duplicate counterparty: {}",
                party
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cqnp_core::{
        Channel, Currency, InMemoryDirectory, InMemoryLedger, Money, Quote, RecordStatus,
    };
    use cqnp_responder::{FixedQuotePricing, Responder, SessionOutcome};
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    fn hospital() -> PartyId {
        PartyId::new("hospital")
    }

    fn sample_estimation() -> CoverageEstimation {
        CoverageEstimation::new("appendectomy", Money::new(dec!(1000), Currency::Usd))
    }

    fn fast_config() -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_grace_period(Duration::ZERO)
            .with_quote_timeout(Duration::from_secs(1))
            .with_commit_timeout(Duration::from_secs(1))
    }

    /// One responder answering a single session, with its outcome observable.
    fn spawn_responder(
        directory: &mut InMemoryDirectory,
        party: &str,
        amount: Money,
    ) -> JoinHandle<CqnpResult<SessionOutcome>> {
        let id = PartyId::new(party);
        let mut listener = directory.register(id.clone());
        let responder = Responder::new(id, Box::new(FixedQuotePricing::new(amount)));
        tokio::spawn(async move {
            let session = listener.accept().await.expect("no session offered");
            responder.respond(Box::new(session)).await
        })
    }

    #[tokio::test]
    async fn highest_quote_wins_and_commits() {
        let mut directory = InMemoryDirectory::new();
        let a = spawn_responder(&mut directory, "a", Money::new(dec!(700), Currency::Usd));
        let b = spawn_responder(&mut directory, "b", Money::new(dec!(950), Currency::Usd));
        let c = spawn_responder(&mut directory, "c", Money::new(dec!(800), Currency::Usd));

        let ledger = Arc::new(InMemoryLedger::new());
        let coordinator = NegotiationCoordinator::with_config(
            hospital(),
            Arc::new(directory),
            ledger.clone(),
            fast_config(),
        );

        let agreement = coordinator
            .run_negotiation(
                sample_estimation(),
                &[PartyId::new("a"), PartyId::new("b"), PartyId::new("c")],
            )
            .await
            .unwrap();

        assert_eq!(agreement.winner, PartyId::new("b"));
        let finalized = &agreement.finalized;
        assert_eq!(finalized.record.status, RecordStatus::Quoted);
        assert_eq!(
            finalized.record.winning_quote.as_ref().unwrap().amount,
            Money::new(dec!(950), Currency::Usd)
        );
        assert_eq!(finalized.signers, vec![hospital(), PartyId::new("b")]);
        assert!(ledger.get(&finalized.reference).await.is_some());

        // Exactly one verdict each: losers rejected, winner committed.
        assert_eq!(a.await.unwrap().unwrap(), SessionOutcome::Rejected);
        assert_eq!(c.await.unwrap().unwrap(), SessionOutcome::Rejected);
        match b.await.unwrap().unwrap() {
            SessionOutcome::Committed(record) => assert_eq!(record, finalized.record),
            other => panic!("winner ended {:?}", other),
        }
    }

    #[tokio::test]
    async fn tie_breaks_toward_request_order() {
        let mut directory = InMemoryDirectory::new();
        let a = spawn_responder(&mut directory, "a", Money::new(dec!(700), Currency::Usd));
        let b = spawn_responder(&mut directory, "b", Money::new(dec!(950), Currency::Usd));
        let c = spawn_responder(&mut directory, "c", Money::new(dec!(950), Currency::Usd));

        let coordinator = NegotiationCoordinator::with_config(
            hospital(),
            Arc::new(directory),
            Arc::new(InMemoryLedger::new()),
            fast_config(),
        );

        let agreement = coordinator
            .run_negotiation(
                sample_estimation(),
                &[PartyId::new("a"), PartyId::new("b"), PartyId::new("c")],
            )
            .await
            .unwrap();

        assert_eq!(agreement.winner, PartyId::new("b"));
        assert!(matches!(
            b.await.unwrap().unwrap(),
            SessionOutcome::Committed(_)
        ));
        assert_eq!(a.await.unwrap().unwrap(), SessionOutcome::Rejected);
        assert_eq!(c.await.unwrap().unwrap(), SessionOutcome::Rejected);
    }

    #[tokio::test]
    async fn round_with_no_valid_quotes_fails_before_any_verdict() {
        let mut directory = InMemoryDirectory::new();
        // Sole counterparty quotes in the wrong currency.
        let eur = spawn_responder(
            &mut directory,
            "eur-only",
            Money::new(dec!(900), Currency::Eur),
        );

        let coordinator = NegotiationCoordinator::with_config(
            hospital(),
            Arc::new(directory),
            Arc::new(InMemoryLedger::new()),
            fast_config(),
        );

        let result = coordinator
            .run_negotiation(sample_estimation(), &[PartyId::new("eur-only")])
            .await;
        assert!(matches!(result, Err(CqnpError::NoQuotesAvailable)));

        // The responder never saw a decision; its session died on a closed
        // channel rather than ending rejected.
        assert!(eur.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn timed_out_counterparty_is_excluded_not_fatal() {
        let mut directory = InMemoryDirectory::new();
        let mut silent_listener = directory.register(PartyId::new("silent"));
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Some(session) = silent_listener.accept().await {
                held.push(session);
            }
        });
        let prompt = spawn_responder(
            &mut directory,
            "prompt",
            Money::new(dec!(300), Currency::Usd),
        );

        let coordinator = NegotiationCoordinator::with_config(
            hospital(),
            Arc::new(directory),
            Arc::new(InMemoryLedger::new()),
            fast_config().with_quote_timeout(Duration::from_millis(150)),
        );

        let agreement = coordinator
            .run_negotiation(
                sample_estimation(),
                &[
                    PartyId::new("silent"),
                    PartyId::new("missing"),
                    PartyId::new("prompt"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(agreement.winner, PartyId::new("prompt"));
        assert!(matches!(
            prompt.await.unwrap().unwrap(),
            SessionOutcome::Committed(_)
        ));
    }

    #[tokio::test]
    async fn input_validation_comes_first() {
        let coordinator = NegotiationCoordinator::with_config(
            hospital(),
            Arc::new(InMemoryDirectory::new()),
            Arc::new(InMemoryLedger::new()),
            fast_config(),
        );

        let no_description =
            CoverageEstimation::new("", Money::new(dec!(1000), Currency::Usd));
        assert!(matches!(
            coordinator
                .run_negotiation(no_description, &[PartyId::new("a")])
                .await,
            Err(CqnpError::Validation(_))
        ));

        let negative = CoverageEstimation::new("scan", Money::new(dec!(-10), Currency::Usd));
        assert!(matches!(
            coordinator
                .run_negotiation(negative, &[PartyId::new("a")])
                .await,
            Err(CqnpError::Validation(_))
        ));

        assert!(matches!(
            coordinator.run_negotiation(sample_estimation(), &[]).await,
            Err(CqnpError::Validation(_))
        ));

        assert!(matches!(
            coordinator
                .run_negotiation(
                    sample_estimation(),
                    &[PartyId::new("a"), PartyId::new("a")]
                )
                .await,
            Err(CqnpError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn refused_approval_is_fatal() {
        let mut directory = InMemoryDirectory::new();
        let refuser = PartyId::new("refuser");
        let mut listener = directory.register(refuser.clone());
        // A counterparty that quotes, then refuses to co-sign anything.
        let refuser_id = refuser.clone();
        tokio::spawn(async move {
            let mut channel = listener.accept().await.expect("no session offered");
            let request = channel.recv().await.unwrap();
            let offer = Envelope::reply(
                &request,
                refuser_id.clone(),
                Payload::QuoteOffer {
                    quote: Quote::new(
                        refuser_id.clone(),
                        Money::new(dec!(500), Currency::Usd),
                    ),
                },
            );
            channel.send(offer).await.unwrap();
            let _decision = channel.recv().await.unwrap();
            let proposal = channel.recv().await.unwrap();
            let refusal = Envelope::reply(
                &proposal,
                refuser_id,
                Payload::CommitApproval {
                    approved: false,
                    reason: Some("not signing that".to_string()),
                },
            );
            channel.send(refusal).await.unwrap();
        });

        let coordinator = NegotiationCoordinator::with_config(
            hospital(),
            Arc::new(directory),
            Arc::new(InMemoryLedger::new()),
            fast_config(),
        );

        let result = coordinator
            .run_negotiation(sample_estimation(), &[refuser.clone()])
            .await;
        match result {
            Err(CqnpError::Commit(CommitError::SignerRefused { party, reason })) => {
                assert_eq!(party, refuser);
                assert_eq!(reason, "not signing that");
            }
            other => panic!("expected signer refusal, got {:?}", other),
        }
    }

    /// Ledger double whose transitions always conflict.
    struct RefusingLedger {
        inner: InMemoryLedger,
    }

    #[async_trait]
    impl ConsensusLedger for RefusingLedger {
        async fn propose_initial_record(
            &self,
            record: TreatmentRecord,
            proposer: PartyId,
        ) -> Result<FinalizedRecord, CommitError> {
            self.inner.propose_initial_record(record, proposer).await
        }

        async fn propose_transition(
            &self,
            input: RecordRef,
            _output: TreatmentRecord,
            _signers: Vec<PartyId>,
        ) -> Result<FinalizedRecord, CommitError> {
            Err(CommitError::Conflict(input))
        }
    }

    #[tokio::test]
    async fn ledger_conflict_is_fatal() {
        let mut directory = InMemoryDirectory::new();
        let winner = spawn_responder(
            &mut directory,
            "winner",
            Money::new(dec!(500), Currency::Usd),
        );

        let coordinator = NegotiationCoordinator::with_config(
            hospital(),
            Arc::new(directory),
            Arc::new(RefusingLedger {
                inner: InMemoryLedger::new(),
            }),
            fast_config(),
        );

        let result = coordinator
            .run_negotiation(sample_estimation(), &[PartyId::new("winner")])
            .await;
        assert!(matches!(
            result,
            Err(CqnpError::Commit(CommitError::Conflict(_)))
        ));

        // The responder approved before the ledger refused, so its side
        // ends committed while the coordinator reports failure.
        assert!(matches!(
            winner.await.unwrap().unwrap(),
            SessionOutcome::Committed(_)
        ));
    }
}
