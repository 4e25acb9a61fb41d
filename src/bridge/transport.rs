//! Transport seam for the bridge link.
//!
//! The lifecycle state machine is written against the abstract capability
//! {connect, receive-next, send, close}; `WsBridgeTransport` implements it
//! over a WebSocket client connection to the Node.js peer. Tests substitute
//! their own peer on a local listener.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::TransportError;

/// Write half of a bridge connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one text frame to the peer.
    async fn send_frame(&mut self, frame: &str) -> Result<(), TransportError>;

    /// Close the connection. Best-effort; safe to call on a dead link.
    async fn close(&mut self);
}

/// Read half of a bridge connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Await the next text frame. `Ok(None)` means the peer closed.
    async fn next_frame(&mut self) -> Result<Option<String>, TransportError>;
}

/// Capability to open a duplex, frame-oriented connection to the bridge peer.
#[async_trait]
pub trait BridgeTransport: Send + Sync {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), TransportError>;
}

// ── WebSocket adapter ───────────────────────────────────────────────

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client transport — the production bridge link.
pub struct WsBridgeTransport;

#[async_trait]
impl BridgeTransport for WsBridgeTransport {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), TransportError> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let (sink, stream) = ws.split();
        Ok((Box::new(WsFrameSink(sink)), Box::new(WsFrameStream(stream))))
    }
}

struct WsFrameSink(SplitSink<WsStream, Message>);

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn send_frame(&mut self, frame: &str) -> Result<(), TransportError> {
        self.0
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.0.close().await;
    }
}

struct WsFrameStream(SplitStream<WsStream>);

#[async_trait]
impl FrameStream for WsFrameStream {
    async fn next_frame(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.0.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // Ping/pong/binary frames are not bridge envelopes
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::Read(e.to_string())),
            }
        }
    }
}
