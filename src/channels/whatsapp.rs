//! WhatsApp channel — connects to a Node.js bridge process.
//!
//! The bridge speaks the WhatsApp Web protocol (via @whiskeysockets/baileys)
//! and forwards events over a WebSocket. This side owns the connection
//! lifecycle, classifies inbound envelopes, logs monitored group chatter
//! for daily digests, and forwards agent replies.
//!
//! Group messages are logged silently; the bot never responds in group
//! chats.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use crate::bridge::codec::{self, InboundEvent, InboundMessage};
use crate::bridge::transport::{BridgeTransport, FrameSink, FrameStream};
use crate::channels::Channel;
use crate::channels::group_log::{GroupLogEntry, GroupLogStore};
use crate::config::WhatsAppConfig;
use crate::error::{ChannelError, CodecError, TransportError};
use crate::pipeline::{AgentMessage, InboundHandler, MessageMetadata, OutboundMessage};

/// Sentinel the bridge emits for voice notes it did not transcribe.
const VOICE_MESSAGE_MARKER: &str = "[Voice Message]";

/// Substituted for the marker before forwarding; media download from the
/// bridge is not supported at this layer.
const VOICE_MESSAGE_PLACEHOLDER: &str =
    "[Voice Message: Transcription not available for WhatsApp yet]";

// ── Connection state ────────────────────────────────────────────────

/// Bridge connection state.
///
/// Transitioned only by the lifecycle loop (and the peer's own status
/// reports, handled inside that loop); the reply path just reads it to
/// gate sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

/// Lock-free cell holding a [`ConnectionState`].
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Disconnected as u8))
    }

    fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    fn get(&self) -> ConnectionState {
        match self.0.load(Ordering::SeqCst) {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Why the listen loop handed control back.
enum ListenEnd {
    Stopped,
    PeerClosed,
    Transport(TransportError),
}

// ── Channel ─────────────────────────────────────────────────────────

/// WhatsApp channel over the bridge WebSocket.
pub struct WhatsAppChannel {
    config: WhatsAppConfig,
    transport: Arc<dyn BridgeTransport>,
    handler: Arc<dyn InboundHandler>,
    group_log: GroupLogStore,
    state: StateCell,
    /// Write half of the live connection, shared with the reply path.
    sink: Mutex<Option<Box<dyn FrameSink>>>,
    stop_tx: watch::Sender<bool>,
}

impl WhatsAppChannel {
    pub fn new(
        config: WhatsAppConfig,
        transport: Arc<dyn BridgeTransport>,
        handler: Arc<dyn InboundHandler>,
    ) -> Self {
        let group_log = GroupLogStore::new(config.group_log_dir.clone());
        let (stop_tx, _) = watch::channel(false);
        Self {
            config,
            transport,
            handler,
            group_log,
            state: StateCell::new(),
            sink: Mutex::new(None),
            stop_tx,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Receive frames until stop, peer close, or a transport error.
    async fn listen(
        &self,
        stream: &mut Box<dyn FrameStream>,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> ListenEnd {
        loop {
            tokio::select! {
                _ = stop_rx.changed() => return ListenEnd::Stopped,
                frame = stream.next_frame() => match frame {
                    Ok(Some(text)) => {
                        // Per-frame failures stay per-frame; only transport
                        // errors tear the connection down.
                        if let Err(e) = self.handle_frame(&text).await {
                            error!("Error handling bridge message: {e}");
                        }
                    }
                    Ok(None) => return ListenEnd::PeerClosed,
                    Err(e) => return ListenEnd::Transport(e),
                },
            }
        }
    }

    /// Decode and route one frame from the bridge.
    async fn handle_frame(&self, raw: &str) -> Result<(), ChannelError> {
        let event = match codec::decode(raw) {
            Ok(event) => event,
            Err(CodecError::Malformed { excerpt }) => {
                warn!("Invalid JSON from bridge: {excerpt}");
                return Ok(());
            }
            Err(CodecError::UnknownKind { kind }) => {
                debug!(kind = %kind, "Ignoring unrecognized bridge frame");
                return Ok(());
            }
        };

        match event {
            InboundEvent::Message(msg) => self.route_message(msg).await,
            InboundEvent::Status(status) => {
                info!("WhatsApp status: {status}");
                match status.as_str() {
                    "connected" => self.state.set(ConnectionState::Connected),
                    "disconnected" => self.state.set(ConnectionState::Disconnected),
                    // other values are informational only
                    _ => {}
                }
                Ok(())
            }
            InboundEvent::AuthPrompt => {
                info!("Scan the QR code in the bridge terminal to connect WhatsApp");
                Ok(())
            }
            InboundEvent::Error(err) => {
                error!("WhatsApp bridge error: {err}");
                Ok(())
            }
        }
    }

    /// Route a chat message: group chatter to the digest log, direct
    /// messages to the agent pipeline.
    async fn route_message(&self, msg: InboundMessage) -> Result<(), ChannelError> {
        if msg.is_group {
            let group_jid = if msg.sender.is_empty() {
                "unknown"
            } else {
                msg.sender.as_str()
            };
            if self.config.monitors_group(group_jid) {
                let entry = GroupLogEntry {
                    ts: msg.timestamp.unwrap_or(0),
                    sender: msg.pn.clone(),
                    content: msg.content.clone(),
                };
                self.group_log.append(group_jid, &entry).await?;
            }
            // Never forwarded: the bot stays silent in groups.
            return Ok(());
        }

        let (sender_id, chat_id) = normalize_identity(&msg.pn, &msg.sender);
        debug!(sender = %msg.sender, "Inbound direct message");

        let mut content = msg.content;
        if content == VOICE_MESSAGE_MARKER {
            info!(
                "Voice message received from {sender_id}, but direct download \
                 from the bridge is not supported"
            );
            content = VOICE_MESSAGE_PLACEHOLDER.to_string();
        }

        self.handler
            .handle_message(AgentMessage {
                sender_id,
                chat_id,
                content,
                metadata: MessageMetadata {
                    message_id: msg.id,
                    timestamp: msg.timestamp,
                    is_group: false,
                },
            })
            .await
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    /// Connect → listen → (on failure) backoff → reconnect, until stopped.
    async fn run(&self) -> Result<(), ChannelError> {
        let mut stop_rx = self.stop_tx.subscribe();

        info!("Connecting to WhatsApp bridge at {}...", self.config.bridge_url);

        loop {
            if *stop_rx.borrow() {
                break;
            }

            self.state.set(ConnectionState::Connecting);
            match self.transport.connect(&self.config.bridge_url).await {
                Ok((sink, mut stream)) => {
                    *self.sink.lock().await = Some(sink);
                    self.state.set(ConnectionState::Connected);
                    info!("Connected to WhatsApp bridge");

                    let end = self.listen(&mut stream, &mut stop_rx).await;

                    if let Some(mut sink) = self.sink.lock().await.take() {
                        sink.close().await;
                    }
                    self.state.set(ConnectionState::Disconnected);

                    match end {
                        ListenEnd::Stopped => break,
                        ListenEnd::PeerClosed => {
                            warn!("WhatsApp bridge closed the connection");
                        }
                        ListenEnd::Transport(e) => {
                            warn!("WhatsApp bridge connection error: {e}");
                        }
                    }
                }
                Err(e) => {
                    self.state.set(ConnectionState::Disconnected);
                    warn!("WhatsApp bridge connection error: {e}");
                }
            }

            if *stop_rx.borrow() {
                break;
            }

            info!(
                "Reconnecting in {} seconds...",
                self.config.reconnect_delay.as_secs()
            );
            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        self.state.set(ConnectionState::Disconnected);
        Ok(())
    }

    async fn stop(&self) {
        // send_replace stores the flag even when no receiver is subscribed
        // yet, so a stop issued before run() is never lost.
        self.stop_tx.send_replace(true);
        if let Some(mut sink) = self.sink.lock().await.take() {
            sink.close().await;
        }
        self.state.set(ConnectionState::Disconnected);
    }

    async fn send(&self, msg: &OutboundMessage) {
        if self.state.get() != ConnectionState::Connected {
            warn!("WhatsApp bridge not connected, dropping outbound message");
            return;
        }

        let frame = codec::encode_send(&msg.chat_id, &msg.content);
        let mut guard = self.sink.lock().await;
        match guard.as_mut() {
            Some(sink) => {
                if let Err(e) = sink.send_frame(&frame).await {
                    error!("Error sending WhatsApp message: {e}");
                }
            }
            None => warn!("WhatsApp bridge not connected, dropping outbound message"),
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Split the two historical sender-identity formats into the agent-facing
/// id and the reply target.
///
/// The legacy phone-number JID (`pn`) is preferred when present, falling
/// back to the newer linked-identity JID; either way the agent-facing id
/// is the part before the first `@`. Replies always go to the full
/// `sender` address — the network rejects the shortened form.
fn normalize_identity(pn: &str, sender: &str) -> (String, String) {
    let user_id = if pn.is_empty() { sender } else { pn };
    let sender_id = user_id.split('@').next().unwrap_or(user_id).to_string();
    (sender_id, sender.to_string())
}

// ── Tests ───────────────────────────────────────────────────────────
