//! Duplex streaming transport to the remote endpoint
//!
//! The session only ever sees the [`Transport`] seam: an async `open` that
//! resolves to a fire-and-forget send handle plus an ordered inbound event
//! stream. The WebSocket implementation lives in [`ws`]; tests use a
//! channel-backed implementation.

pub mod messages;
pub mod ws;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::codec::EncodedChunk;
use crate::config::SessionConfig;
use crate::error::TransportError;

pub use ws::WsTransport;

/// Inbound session event, delivered in strict arrival order
#[derive(Debug)]
pub enum TransportEvent {
    /// The endpoint accepted the session setup; streaming may begin
    Opened,
    /// One synthesized reply payload (raw PCM bytes)
    AudioSegment(Bytes),
    /// The user barged in; all queued reply audio must stop
    Interrupted,
    /// Graceful remote close
    Closed,
    /// Transport failure; terminal for the session
    Error(TransportError),
}

/// Outbound half of an open session.
///
/// `send` is fire-and-forget: chunks are queued unconditionally with no
/// acknowledgement or flow control, and delivery is the transport's concern.
pub trait TransportHandle: Send + Sync {
    /// Queue one encoded chunk for delivery, preserving call order
    fn send(&self, chunk: EncodedChunk);

    /// Close the connection; idempotent
    fn close(&self);
}

/// Connection factory for the remote endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a duplex streaming channel configured by `config`.
    ///
    /// Resolves once the channel is established; the `Opened` event arrives
    /// later on the returned stream, and the encode/send pipeline must not
    /// run before it. No timeout governs the open.
    async fn open(
        &self,
        config: SessionConfig,
    ) -> Result<(Box<dyn TransportHandle>, UnboundedReceiver<TransportEvent>), TransportError>;
}
