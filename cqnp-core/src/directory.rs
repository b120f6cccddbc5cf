//! Counterparty directory: resolve a party identity to a fresh session.
//!
//! [`InMemoryDirectory`] wires negotiations up inside one process. Parties
//! register before the directory is shared, each receiving a
//! [`SessionListener`] they accept inbound sessions from, in the same shape
//! a network listener would take.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::channel::{Channel, InProcChannel};
use crate::error::ChannelError;
use crate::message::PartyId;

const LISTENER_BACKLOG: usize = 16;

/// Resolves a counterparty identity and opens a dedicated session channel
/// to it.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn open_session(&self, party: &PartyId) -> Result<Box<dyn Channel>, ChannelError>;
}

/// Inbound side of in-process session establishment.
pub struct SessionListener {
    incoming: mpsc::Receiver<InProcChannel>,
}

impl SessionListener {
    /// Wait for the next inbound session. Returns `None` once the directory
    /// has been dropped and no sessions remain.
    pub async fn accept(&mut self) -> Option<InProcChannel> {
        self.incoming.recv().await
    }
}

/// Directory over parties living in the same process.
#[derive(Default)]
pub struct InMemoryDirectory {
    parties: HashMap<PartyId, mpsc::Sender<InProcChannel>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a party and hand back the listener it accepts sessions on.
    ///
    /// Registration happens during setup, before the directory is shared;
    /// re-registering a party replaces its previous listener.
    pub fn register(&mut self, party: PartyId) -> SessionListener {
        let (tx, rx) = mpsc::channel(LISTENER_BACKLOG);
        self.parties.insert(party, tx);
        SessionListener { incoming: rx }
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn open_session(&self, party: &PartyId) -> Result<Box<dyn Channel>, ChannelError> {
        let sender = self
            .parties
            .get(party)
            .ok_or_else(|| ChannelError::Transport(format!("unknown party: {party}")))?;

        let (local, remote) = InProcChannel::pair();
        sender.send(remote).await.map_err(|_| {
            ChannelError::Transport(format!("{party} is no longer accepting sessions"))
        })?;
        Ok(Box::new(local))
    }
}
