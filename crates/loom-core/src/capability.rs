//! Capability traits consumed by the session core: the wire
//! protocol, tool execution, permission UI, and config layer are all
//! external collaborators. This module only defines the seams.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::message::Message;
use crate::model_usage::{ModelUsage, OptionValue};

/// Outbound request built by an `Agent` for one model turn.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model_name: String,
    pub options: HashMap<String, OptionValue>,
    pub thinking: bool,
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// One chunk of a streaming model response.
#[derive(Debug, Clone)]
pub struct ChatChunk {
    pub text: String,
    pub is_thinking: bool,
    pub done: bool,
    /// Final stop-reason style classifier, present only when `done`.
    pub stop_reason: Option<String>,
    pub stats: Option<ChatStats>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatStats {
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub duration_ms: u64,
}

/// One entry of a connection's model catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub supports_thinking: bool,
}

/// A connection known to the config layer, along with the models it serves.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub connection_id: String,
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Error)]
pub enum ModelConnectorError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("connector unavailable: {0}")]
    Unavailable(String),

    #[error("request cancelled")]
    Cancelled,
}

/// The HTTP wire protocol to a model server, owned by an external
/// collaborator. `Agent`/`ChatCall` only ever see this trait.
#[async_trait]
pub trait ModelConnector: Send + Sync {
    /// Stream a chat completion, pushing chunks to `tx` as they arrive.
    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<ChatChunk>,
    ) -> Result<(), ModelConnectorError>;

    /// Non-streaming completion, used by `TitleGenerator`.
    async fn generate(&self, model_name: &str, prompt: &str) -> Result<String, ModelConnectorError>;

    /// List the models a connection serves, used by `ensure_model_usage`
    /// and by `Placeholder::load` to resolve a stored `model_name`.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelConnectorError>;
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("permission denied for {action}")]
    PermissionDenied { action: String },

    #[error("tool execution failed: {0}")]
    Failed(String),
}

/// Outcome of a single tool invocation.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
}

/// Context handed to a `Tool::execute` call. Carries only what a tool needs
/// to ask permission and attribute its work to a session — sandboxing,
/// filesystem access, and the rest of the tool's actual behavior are the
/// tool's own business.
pub struct ToolContext<'a> {
    pub session_fid: &'a str,
    pub permission: &'a dyn PermissionProvider,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> serde_json::Value;
    async fn execute(&self, args: serde_json::Value, context: ToolContext<'_>) -> Result<ToolResult, ToolError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionVerdict {
    Allow,
    Deny,
}

#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Default implementation denies by policy; concrete providers consult
    /// a user or a stored policy. Not further specified.
    async fn ask(&self, action: &str, target: &str) -> PermissionVerdict;
}

/// Denies every request. The safe default when no provider is wired in.
pub struct DenyAllPermissions;

#[async_trait]
impl PermissionProvider for DenyAllPermissions {
    async fn ask(&self, _action: &str, _target: &str) -> PermissionVerdict {
        PermissionVerdict::Deny
    }
}

/// Config capability: connections, per-model options,
/// tool-enabled map, default/title model usage, and a `changed` signal.
pub trait ConfigProvider: Send + Sync {
    fn connections(&self) -> Vec<ConnectionInfo>;
    fn model_options(&self, model_name: &str) -> HashMap<String, OptionValue>;
    fn tool_enabled(&self, tool_name: &str) -> bool;
    fn default_model_usage(&self) -> ModelUsage;
    fn title_model_usage(&self) -> Option<ModelUsage>;
    /// Subscribe to configuration change notifications. Each mutation to
    /// connections, options, or tool flags sends `()` to every subscriber.
    fn subscribe_changed(&self) -> broadcast::Receiver<()>;
}
