//! Consumed contract of the upstream agent pipeline.
//!
//! The agent loop itself lives outside this crate. Channels only need a
//! sink to hand normalized direct messages into, and the outbound reply
//! type the agent produces.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ChannelError;

/// Channel-agnostic metadata forwarded alongside a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub message_id: Option<String>,
    /// Unix timestamp in seconds, as reported by the network.
    pub timestamp: Option<i64>,
    pub is_group: bool,
}

/// A direct message normalized for the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Short sender id used for agent-side user identification.
    pub sender_id: String,
    /// Full network address — replies must be sent here, not to `sender_id`.
    pub chat_id: String,
    pub content: String,
    pub metadata: MessageMetadata,
}

/// A reply produced by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub chat_id: String,
    pub content: String,
}

/// Inbound sink the router dispatches direct messages into.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle_message(&self, msg: AgentMessage) -> Result<(), ChannelError>;
}

/// Forwards inbound messages into an mpsc queue consumed by the agent host.
pub struct QueueHandler {
    tx: mpsc::UnboundedSender<AgentMessage>,
}

impl QueueHandler {
    pub fn new(tx: mpsc::UnboundedSender<AgentMessage>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl InboundHandler for QueueHandler {
    async fn handle_message(&self, msg: AgentMessage) -> Result<(), ChannelError> {
        self.tx
            .send(msg)
            .map_err(|_| ChannelError::Dispatch("agent queue closed".into()))
    }
}
