//! Accept loop hosting one responder over a session listener.

use std::sync::Arc;

use cqnp_core::SessionListener;

use crate::responder::{Responder, SessionOutcome};

/// Runs a [`Responder`] against every session a listener accepts.
///
/// Each session runs on its own task, so one slow or hostile coordinator
/// never blocks quotes to anyone else.
pub struct ResponderHost {
    responder: Arc<Responder>,
    listener: SessionListener,
}

impl ResponderHost {
    pub fn new(responder: Responder, listener: SessionListener) -> Self {
        Self {
            responder: Arc::new(responder),
            listener,
        }
    }

    /// Accept sessions until the directory side is dropped.
    pub async fn run(mut self) {
        tracing::info!("{} accepting negotiation sessions", self.responder.party());

        while let Some(session) = self.listener.accept().await {
            let responder = Arc::clone(&self.responder);
            tokio::spawn(async move {
                match responder.respond(Box::new(session)).await {
                    Ok(SessionOutcome::Committed(record)) => {
                        tracing::info!(
                            "{}: committed to record {}",
                            responder.party(),
                            record.record_id
                        );
                    }
                    Ok(SessionOutcome::Rejected) => {
                        tracing::debug!("{}: session ended rejected", responder.party());
                    }
                    Err(e) => {
                        tracing::error!("{}: session failed: {}", responder.party(), e);
                    }
                }
            });
        }

        tracing::debug!("{}: listener closed, host stopping", self.responder.party());
    }
}
