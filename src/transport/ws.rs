//! WebSocket transport implementation
//!
//! One writer task drains the outbound queue and one reader task maps server
//! frames to [`TransportEvent`]s, so event order matches arrival order.

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use async_trait::async_trait;

use crate::codec::EncodedChunk;
use crate::config::SessionConfig;
use crate::error::TransportError;
use crate::transport::messages;
use crate::transport::{Transport, TransportEvent, TransportHandle};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client for the remote speech endpoint
pub struct WsTransport {
    endpoint: String,
}

impl WsTransport {
    /// `endpoint` is the full connection URL, API key included
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(
        &self,
        config: SessionConfig,
    ) -> Result<(Box<dyn TransportHandle>, UnboundedReceiver<TransportEvent>), TransportError>
    {
        let (socket, _) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut write, read) = socket.split();

        let setup = serde_json::to_string(&messages::setup_message(&config))
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        write
            .send(Message::Text(setup))
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(model = %config.model, "session setup sent");

        let (event_tx, event_rx) = unbounded_channel();
        let (out_tx, out_rx) = unbounded_channel();

        tokio::spawn(write_loop(write, out_rx));
        tokio::spawn(read_loop(read, event_tx));

        let handle = WsHandle {
            out: Mutex::new(Some(out_tx)),
        };
        Ok((Box::new(handle), event_rx))
    }
}

struct WsHandle {
    out: Mutex<Option<UnboundedSender<EncodedChunk>>>,
}

impl TransportHandle for WsHandle {
    fn send(&self, chunk: EncodedChunk) {
        if let Some(out) = self.out.lock().as_ref() {
            // Fire-and-forget: a dropped writer means the connection is
            // already down and the reader has emitted Closed or Error
            let _ = out.send(chunk);
        }
    }

    fn close(&self) {
        // Dropping the sender ends the writer loop, which sends the close
        // frame. Taking it makes close idempotent.
        self.out.lock().take();
    }
}

async fn write_loop(
    mut write: SplitSink<WsStream, Message>,
    mut out_rx: UnboundedReceiver<EncodedChunk>,
) {
    while let Some(chunk) = out_rx.recv().await {
        let message = match serde_json::to_string(&messages::realtime_input(&chunk)) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("failed to serialize outbound chunk: {}", e);
                continue;
            }
        };
        if write.send(Message::Text(message)).await.is_err() {
            break;
        }
    }
    let _ = write.send(Message::Close(None)).await;
}

async fn read_loop(mut read: SplitStream<WsStream>, events: UnboundedSender<TransportEvent>) {
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => dispatch_server_text(&text, &events),
            Ok(Message::Binary(payload)) => {
                // Some endpoints deliver JSON frames as binary
                match String::from_utf8(payload) {
                    Ok(text) => dispatch_server_text(&text, &events),
                    Err(e) => tracing::warn!("non-UTF-8 binary frame: {}", e),
                }
            }
            Ok(Message::Close(_)) => {
                let _ = events.send(TransportEvent::Closed);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                let _ = events.send(TransportEvent::Error(TransportError::Socket(e.to_string())));
                return;
            }
        }
    }
    let _ = events.send(TransportEvent::Closed);
}

/// Map one server frame to events, preserving the frame's internal order:
/// audio parts first, then the interruption flag.
fn dispatch_server_text(text: &str, events: &UnboundedSender<TransportEvent>) {
    let parsed: messages::ServerMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("unparseable server message: {}", e);
            return;
        }
    };

    if parsed.setup_complete.is_some() {
        let _ = events.send(TransportEvent::Opened);
    }

    let Some(content) = parsed.server_content else {
        return;
    };

    if let Some(turn) = content.model_turn {
        for part in turn.parts {
            let Some(inline) = part.inline_data else {
                continue;
            };
            match messages::decode_inline_data(&inline.data) {
                Ok(payload) => {
                    let _ = events.send(TransportEvent::AudioSegment(Bytes::from(payload)));
                }
                Err(e) => tracing::warn!("undecodable audio part: {}", e),
            }
        }
    }

    if content.interrupted {
        let _ = events.send(TransportEvent::Interrupted);
    }
}
