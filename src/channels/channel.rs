//! Channel trait — the contract between the agent host and a chat channel.

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::pipeline::OutboundMessage;

/// A long-running chat channel.
///
/// `run` and `send` are called from different tasks: the host runs the
/// channel loop in one and forwards agent replies from another.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Drive the channel until `stop` is requested. Blocks.
    async fn run(&self) -> Result<(), ChannelError>;

    /// Request shutdown. Idempotent, callable while `run` is live, and
    /// does not wait for the loop to exit.
    async fn stop(&self);

    /// Forward an agent reply to the network. Best-effort: failures are
    /// logged and swallowed, never returned to the caller.
    async fn send(&self, msg: &OutboundMessage);
}
