use serde::{Deserialize, Serialize};

/// Tag of a single conversation entry.
///
/// Roles fall into three classes (see [`Role::is_visible_persisted`],
/// [`Role::is_streaming_scaffolding`], [`Role::is_transient`]):
/// visible-persisted roles are counted and written to disk; streaming
/// scaffolding is written so an interrupted session can resume display;
/// transient signals are relayed but never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    UserSent,
    Assistant,
    ThinkStream,
    ContentStream,
    EndStream,
    Done,
    Ui,
    Tool,
}

impl Role {
    /// `user-sent`, `assistant`, `ui`, `tool` — serialized and counted in
    /// `total_messages`.
    pub fn is_visible_persisted(&self) -> bool {
        matches!(self, Role::UserSent | Role::Assistant | Role::Ui | Role::Tool)
    }

    /// `content-stream`, `think-stream`, `end-stream` — serialized so a
    /// reload of an interrupted session can resume display.
    pub fn is_streaming_scaffolding(&self) -> bool {
        matches!(self, Role::ThinkStream | Role::ContentStream | Role::EndStream)
    }

    /// `done` — emitted to tools/UI but never persisted.
    pub fn is_transient(&self) -> bool {
        matches!(self, Role::Done)
    }

    /// Whether a role may be persisted at all (visible or scaffolding).
    pub fn is_persistable(&self) -> bool {
        !self.is_transient()
    }

    /// Whether this role counts toward `SessionMetadata.total_messages`.
    ///
    /// Visible-persisted roles count except `tool` — excluded per an open
    /// question in the source drafts, resolved in favor of the narrower
    /// reading used by the newer `Manager` shape.
    pub fn counts_toward_total_messages(&self) -> bool {
        matches!(self, Role::UserSent | Role::Assistant | Role::Ui)
    }

    /// Whether this is one of the two streaming-content roles (as opposed
    /// to the `end-stream` marker that closes them).
    pub fn is_open_stream(&self) -> bool {
        matches!(self, Role::ThinkStream | Role::ContentStream)
    }
}

/// A single entry in a [`crate::MessageLog`]-equivalent ordered log.
///
/// `include_history_info` is transient bookkeeping set only while
/// [`loom_fileio`]-style serialization is in flight; it is never itself
/// persisted and always resets to `false` once serialization completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Set on first serialization; empty until then.
    #[serde(default)]
    pub timestamp: String,
    #[serde(skip, default)]
    pub include_history_info: bool,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: String::new(),
            include_history_info: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Stamp `timestamp` with the current RFC3339 time if unset. Called the
    /// first time a message is serialized to a document.
    pub fn ensure_timestamp(&mut self) {
        if self.timestamp.is_empty() {
            self.timestamp = chrono::Utc::now().to_rfc3339();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_classes_are_disjoint_and_total() {
        for role in [
            Role::User,
            Role::UserSent,
            Role::Assistant,
            Role::ThinkStream,
            Role::ContentStream,
            Role::EndStream,
            Role::Done,
            Role::Ui,
            Role::Tool,
        ] {
            let classes = [
                role.is_visible_persisted(),
                role.is_streaming_scaffolding(),
                role.is_transient(),
            ];
            let count = classes.iter().filter(|c| **c).count();
            // `User` itself belongs to none of the three persistence classes:
            // it never appears in a live log (see Session::send, which
            // synthesizes a `user-sent` twin instead).
            assert!(count <= 1, "role {role:?} is in more than one class");
        }
    }

    #[test]
    fn role_serializes_kebab_case() {
        let json = serde_json::to_string(&Role::UserSent).unwrap();
        assert_eq!(json, "\"user-sent\"");
        let json = serde_json::to_string(&Role::ThinkStream).unwrap();
        assert_eq!(json, "\"think-stream\"");
    }

    #[test]
    fn include_history_info_is_never_serialized() {
        let mut msg = Message::new(Role::Ui, "summary");
        msg.include_history_info = true;
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("include_history_info"));
    }
}
