use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::model_usage::{ModelUsage, OptionValue};
use crate::stream::StreamState;

/// A single logical model request: model identity, options, tool set,
/// cancellation token, and streaming state. Reused across turns of a
/// conversation unless the owning agent is swapped.
#[derive(Debug, Clone)]
pub struct ChatCall {
    pub connection_id: String,
    pub model_name: String,
    pub options: HashMap<String, OptionValue>,
    pub think: bool,
    pub tool_names: Vec<String>,
    pub cancellation_token: CancellationToken,
    pub streaming: StreamState,
}

impl ChatCall {
    pub fn new(usage: &ModelUsage, tool_names: Vec<String>) -> Self {
        Self {
            connection_id: usage.connection_id.clone(),
            model_name: usage.model_name.clone(),
            options: usage.options.clone(),
            think: usage.model_caps.supports_thinking,
            tool_names,
            cancellation_token: CancellationToken::new(),
            streaming: StreamState::Idle,
        }
    }

    /// Update model, connection, options and thinking flag from `usage`
    /// without disturbing the cancellation token or tool set.
    pub fn apply_model_usage(&mut self, usage: &ModelUsage) {
        self.connection_id = usage.connection_id.clone();
        self.model_name = usage.model_name.clone();
        self.options = usage.options.clone();
        self.think = usage.model_caps.supports_thinking;
    }

    /// Fresh cancellation token for a new request cycle; the old token
    /// (if any consumer still holds it) stays cancellable independently.
    pub fn reset_cancellation(&mut self) {
        self.cancellation_token = CancellationToken::new();
    }

    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
