use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::chat_call::ChatCall;
use crate::message::{Message, Role};
use crate::model_usage::ModelUsage;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model call failed: {0}")]
    ModelCall(String),

    #[error("tool {name} failed: {source}")]
    Tool {
        name: String,
        #[source]
        source: crate::capability::ToolError,
    },

    #[error("request cancelled")]
    Cancelled,
}

/// The narrow interface a `Session` exposes to its `Agent` so the agent
/// can relay streaming output without owning the session's message log —
/// a non-owning handle, never a literal reference cycle.
pub trait StreamSink: Send {
    /// One chunk of the live response. `done` mirrors `ChatChunk::done`;
    /// the sink is responsible for finalizing the log and emitting the
    /// trailing `done`/`ui` messages when it sees `done == true`.
    fn on_chunk(&mut self, role: Role, text: &str, done: bool, stats: Option<crate::capability::ChatStats>);

    /// A message outside the streaming lifecycle (tool output, for
    /// instance) that still needs to land in the log and relay upward.
    fn on_message(&mut self, message: Message);
}

/// Per-session request-cycle owner. Implementations build
/// the outbound message array, drive the `ModelConnector`, and route
/// chunks back through `sink`.
#[async_trait]
pub trait Agent: Send {
    async fn send_async(
        &mut self,
        history: Vec<Message>,
        new_message: Message,
        sink: &mut dyn StreamSink,
        cancel: CancellationToken,
    ) -> Result<(), AgentError>;

    fn chat_call(&self) -> &ChatCall;
    fn chat_call_mut(&mut self) -> &mut ChatCall;

    /// Swap in a `ChatCall` carried over from a prior agent, preserving
    /// in-flight conversation context across an `activate_agent` swap.
    fn replace_chat_call(&mut self, call: ChatCall);

    /// Recompute the enabled tool set, e.g. after a config change.
    fn rebuild_tools(&mut self, enabled_tool_names: &[String]);
}

/// Constructs a fresh `Agent` by registered name (`AgentFactory`,
/// looked up by `Manager` on first send and on `activate_agent`).
pub trait AgentFactory: Send + Sync {
    fn create(&self, model_usage: &ModelUsage, tool_names: Vec<String>) -> Box<dyn Agent>;
}
