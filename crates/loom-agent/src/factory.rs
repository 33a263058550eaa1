use std::collections::HashMap;
use std::sync::Arc;

use loom_core::{Agent, AgentFactory, ChatCall, ModelConnector, ModelUsage, PermissionProvider, Tool};

use crate::agent::SessionAgent;

/// Builds `SessionAgent`s for one registered agent name, carrying the
/// connector/tool-registry/permission trio and an optional system prompt
/// to every agent it constructs. A runtime-registered factory per name,
/// since `Manager` registers agent
/// kinds dynamically rather than from a fixed table.
pub struct SessionAgentFactory {
    pub connector: Arc<dyn ModelConnector>,
    pub tool_registry: Arc<HashMap<String, Arc<dyn Tool>>>,
    pub permission: Arc<dyn PermissionProvider>,
    pub system_prompt: Option<String>,
}

impl AgentFactory for SessionAgentFactory {
    fn create(&self, model_usage: &ModelUsage, tool_names: Vec<String>) -> Box<dyn Agent> {
        let chat_call = ChatCall::new(model_usage, tool_names);
        Box::new(SessionAgent::new(
            chat_call,
            Arc::clone(&self.connector),
            Arc::clone(&self.tool_registry),
            Arc::clone(&self.permission),
            self.system_prompt.clone(),
        ))
    }
}
