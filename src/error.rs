//! Error types for the bridge channel.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Transport-level failures on the bridge link.
///
/// Always recoverable: the lifecycle loop answers them with a backoff and
/// reconnect, never by terminating the process.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to connect to bridge at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Bridge read failed: {0}")]
    Read(String),

    #[error("Bridge write failed: {0}")]
    Write(String),
}

/// Frame decode failures.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame was not valid JSON, or field types did not match.
    /// Carries a truncated excerpt of the offending input for diagnostics.
    #[error("Malformed bridge frame: {excerpt}")]
    Malformed { excerpt: String },

    /// Syntactically valid frame with a `type` this side does not know.
    #[error("Unrecognized bridge frame type {kind:?}")]
    UnknownKind { kind: String },
}

/// Failures while routing a single inbound envelope.
///
/// Isolated to that envelope — the receive loop logs them and carries on.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Agent pipeline rejected message: {0}")]
    Dispatch(String),

    #[error("Group log write failed: {0}")]
    GroupLog(#[from] std::io::Error),
}

/// Tool execution errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid parameters for tool {name}: {reason}")]
    InvalidParameters { name: String, reason: String },

    #[error("Tool {name} execution failed: {reason}")]
    ExecutionFailed { name: String, reason: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
