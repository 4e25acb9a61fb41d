//! Tool trait — the interface the agent's tool-invocation framework calls.
//!
//! The framework itself (registry, invocation loop, LLM plumbing) lives
//! upstream; this crate only implements tools against the seam.

use async_trait::async_trait;

use crate::error::ToolError;

/// An agent-invocable capability.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the accepted parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Run the tool. User-facing failures (bad mode, unconfigured account)
    /// come back as explanatory result text; `Err` is reserved for calls
    /// the framework itself got wrong.
    async fn execute(&self, params: serde_json::Value) -> Result<String, ToolError>;
}
