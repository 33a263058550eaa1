use serde::{Deserialize, Serialize};

/// One row of the relational session index.
///
/// `id` and `fid` are immutable after creation. Schema evolution is
/// additive-only: a column missing on an older row falls back to the
/// defaults below (see [`crate::db::row_to_metadata`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub id: i64,
    pub fid: String,
    pub updated_at: i64,
    pub title: String,
    pub model_name: String,
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    pub total_messages: i64,
    pub total_tokens: i64,
    pub duration_seconds: i64,
}

pub fn default_agent_name() -> String {
    "just-ask".to_string()
}

impl SessionMetadata {
    /// A brand-new, not-yet-persisted row. `id` is populated by
    /// [`crate::SessionStore::insert`].
    pub fn new(fid: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            fid: fid.into(),
            updated_at: chrono::Utc::now().timestamp(),
            title: String::new(),
            model_name: model_name.into(),
            agent_name: default_agent_name(),
            total_messages: 0,
            total_tokens: 0,
            duration_seconds: 0,
        }
    }
}
