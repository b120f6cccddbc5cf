//! Message channel abstraction between negotiation participants.
//!
//! The protocol only assumes ordered, reliable, asynchronous delivery of
//! envelopes between two parties. [`InProcChannel`] is the in-process
//! baseline; a networked implementation plugs in behind the same trait.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::ChannelError;
use crate::message::Envelope;

const IN_PROC_CAPACITY: usize = 32;

/// One side of a bidirectional, ordered message channel.
#[async_trait]
pub trait Channel: Send {
    /// Queue a message for the peer. Returns once the transport has
    /// accepted it, not once the peer has processed it.
    async fn send(&mut self, message: Envelope) -> Result<(), ChannelError>;

    /// Wait for the next message from the peer, indefinitely.
    async fn recv(&mut self) -> Result<Envelope, ChannelError>;

    /// Wait for the next message up to `timeout`.
    async fn recv_timeout(&mut self, timeout: Duration) -> Result<Envelope, ChannelError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout(timeout)),
        }
    }

    /// Send a message and wait up to `timeout` for the reply.
    async fn request(
        &mut self,
        message: Envelope,
        timeout: Duration,
    ) -> Result<Envelope, ChannelError> {
        self.send(message).await?;
        self.recv_timeout(timeout).await
    }
}

/// In-process channel backed by a crossed pair of bounded mpsc queues.
pub struct InProcChannel {
    tx: mpsc::Sender<Envelope>,
    rx: mpsc::Receiver<Envelope>,
}

impl InProcChannel {
    /// Create both ends of a connected channel.
    pub fn pair() -> (InProcChannel, InProcChannel) {
        let (left_tx, left_rx) = mpsc::channel(IN_PROC_CAPACITY);
        let (right_tx, right_rx) = mpsc::channel(IN_PROC_CAPACITY);
        (
            InProcChannel {
                tx: left_tx,
                rx: right_rx,
            },
            InProcChannel {
                tx: right_tx,
                rx: left_rx,
            },
        )
    }
}

#[async_trait]
impl Channel for InProcChannel {
    async fn send(&mut self, message: Envelope) -> Result<(), ChannelError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| ChannelError::Closed)
    }

    async fn recv(&mut self) -> Result<Envelope, ChannelError> {
        self.rx.recv().await.ok_or(ChannelError::Closed)
    }
}
