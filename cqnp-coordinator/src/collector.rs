//! Concurrent quote collection.
//!
//! Fan-out: one task per counterparty, each opening its own session through
//! the directory and running a single bounded request/response. A slow or
//! dead counterparty costs the round at most `quote_timeout`, never blocks
//! it. Results come back in counterparty-list order, which is the
//! "collection order" the selection tie-break refers to.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use cqnp_core::{
    CollectionError, CoverageEstimation, Envelope, IdentityDirectory, InvalidQuoteReason, PartyId,
    Payload, Quote,
};

use crate::session::NegotiationSession;

/// Result of one counterparty's exchange during collection.
pub struct QuoteExchange {
    pub counterparty: PartyId,
    pub result: Result<Quote, CollectionError>,
    /// The live session, present exactly when a valid quote came back; the
    /// coordinator keeps it open to deliver the verdict.
    pub session: Option<NegotiationSession>,
}

/// Request a quote from every counterparty concurrently.
pub async fn collect_quotes(
    directory: Arc<dyn IdentityDirectory>,
    coordinator: PartyId,
    negotiation_id: Uuid,
    estimation: CoverageEstimation,
    counterparties: &[PartyId],
    quote_timeout: Duration,
) -> Vec<QuoteExchange> {
    let mut handles = Vec::with_capacity(counterparties.len());
    for counterparty in counterparties {
        let directory = Arc::clone(&directory);
        let coordinator = coordinator.clone();
        let counterparty = counterparty.clone();
        let estimation = estimation.clone();
        handles.push(tokio::spawn(async move {
            exchange(
                directory,
                coordinator,
                negotiation_id,
                estimation,
                counterparty,
                quote_timeout,
            )
            .await
        }));
    }

    let mut exchanges = Vec::with_capacity(handles.len());
    for (handle, counterparty) in handles.into_iter().zip(counterparties) {
        match handle.await {
            Ok(exchange) => exchanges.push(exchange),
            Err(e) => exchanges.push(QuoteExchange {
                counterparty: counterparty.clone(),
                result: Err(CollectionError::Transport(format!(
                    "collection task failed: {}",
                    e
                ))),
                session: None,
            }),
        }
    }
    exchanges
}

async fn exchange(
    directory: Arc<dyn IdentityDirectory>,
    coordinator: PartyId,
    negotiation_id: Uuid,
    estimation: CoverageEstimation,
    counterparty: PartyId,
    quote_timeout: Duration,
) -> QuoteExchange {
    let channel = match directory.open_session(&counterparty).await {
        Ok(channel) => channel,
        Err(e) => {
            return QuoteExchange {
                counterparty,
                result: Err(e.into()),
                session: None,
            }
        }
    };
    let mut session = NegotiationSession::new(counterparty.clone(), channel);

    let request = Envelope::new(
        coordinator,
        negotiation_id,
        Payload::EstimationRequest {
            estimation: estimation.clone(),
        },
    );
    let response = match session.request(request, quote_timeout).await {
        Ok(response) => response,
        Err(e) => {
            return QuoteExchange {
                counterparty,
                result: Err(e.into()),
                session: None,
            }
        }
    };

    let quote = match response.payload {
        Payload::QuoteOffer { quote } => quote,
        other => {
            return QuoteExchange {
                counterparty,
                result: Err(InvalidQuoteReason::UnexpectedPayload(other.kind()).into()),
                session: None,
            }
        }
    };
    if let Err(reason) = quote.validate_against(&estimation) {
        return QuoteExchange {
            counterparty,
            result: Err(reason.into()),
            session: None,
        };
    }

    QuoteExchange {
        counterparty,
        result: Ok(quote),
        session: Some(session),
    }
}
