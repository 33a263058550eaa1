pub mod agent_api;
pub mod capability;
pub mod chat_call;
pub mod message;
pub mod model_usage;
pub mod stream;

pub use agent_api::{Agent, AgentError, AgentFactory, StreamSink};
pub use capability::{
    ChatChunk, ChatRequest, ChatStats, ConfigProvider, ConnectionInfo, DenyAllPermissions,
    ModelConnector, ModelConnectorError, ModelInfo, PermissionProvider, PermissionVerdict, Tool,
    ToolContext, ToolError, ToolResult,
};
pub use chat_call::ChatCall;
pub use message::{Message, Role};
pub use model_usage::{ModelCaps, ModelUsage, OptionValue};
pub use stream::StreamState;
