use serde::{Deserialize, Serialize};

use loom_core::{Message, ModelUsage};

/// The full per-session document written to `<fid-path>.json`.
///
/// `#[serde(default)]` on every field makes reads tolerant of older files
/// missing newer columns. `child_chats` is carried as an opaque value —
/// no known code path populates it yet, so this crate only round-trips it
/// faithfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub id: i64,
    pub fid: String,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub title: String,
    pub model_usage: ModelUsage,
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    #[serde(default)]
    pub total_messages: i64,
    #[serde(default)]
    pub total_tokens: i64,
    #[serde(default)]
    pub duration_seconds: i64,
    #[serde(default = "default_child_chats")]
    pub child_chats: serde_json::Value,
    #[serde(default)]
    pub messages: Vec<Message>,
}

fn default_child_chats() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

fn default_agent_name() -> String {
    "just-ask".to_string()
}
