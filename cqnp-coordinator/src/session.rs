//! Per-counterparty session handle.

use std::time::Duration;

use cqnp_core::{Channel, ChannelError, Envelope, PartyId};

/// One live channel to one counterparty, held for the rest of the round.
///
/// Sessions expose channel operations only; round state stays with the
/// coordinator.
pub struct NegotiationSession {
    counterparty: PartyId,
    channel: Box<dyn Channel>,
}

impl NegotiationSession {
    pub fn new(counterparty: PartyId, channel: Box<dyn Channel>) -> Self {
        Self {
            counterparty,
            channel,
        }
    }

    pub fn counterparty(&self) -> &PartyId {
        &self.counterparty
    }

    pub async fn send(&mut self, message: Envelope) -> Result<(), ChannelError> {
        self.channel.send(message).await
    }

    pub async fn request(
        &mut self,
        message: Envelope,
        timeout: Duration,
    ) -> Result<Envelope, ChannelError> {
        self.channel.request(message, timeout).await
    }
}
