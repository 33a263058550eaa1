use tracing::warn;

use loom_core::{AgentFactory, ConfigProvider, Message, ModelUsage, Role};
use loom_fileio::SessionFileIO;
use loom_store::{SessionMetadata, SessionStore};

use crate::error::LoadError;
use crate::log::MessageLog;
use crate::sink::{SessionSink, StreamEvent};

/// `Manager.create_new_session()`'s result: no fid, no store row, no log.
/// `send` promotes it to a `Loaded` session.
#[derive(Debug, Clone)]
pub struct EmptySession {
    pub agent_name: String,
    pub model_usage: ModelUsage,
}

impl EmptySession {
    pub fn new(agent_name: impl Into<String>, model_usage: ModelUsage) -> Self {
        Self {
            agent_name: agent_name.into(),
            model_usage,
        }
    }

    /// Build the `Loaded` session this empty promotes into on first send.
    /// `fid` is caller-supplied (a fresh `YYYY-MM-DD-HH-MM-SS` stamp) so
    /// `Manager` controls identity generation in one place.
    pub fn promote(&self, fid: String) -> LoadedSession {
        LoadedSession {
            store_id: None,
            fid,
            updated_at: chrono::Utc::now().timestamp(),
            title: String::new(),
            agent_name: self.agent_name.clone(),
            model_usage: self.model_usage.clone(),
            total_tokens: 0,
            duration_seconds: 0,
            log: MessageLog::new(),
            agent: None,
            is_running: false,
            is_active: false,
            unread_count: 0,
        }
    }
}

/// A row known to the index but not yet read from its document file
///. Carries metadata only.
#[derive(Debug, Clone)]
pub struct SessionPlaceholder {
    pub metadata: SessionMetadata,
}

impl SessionPlaceholder {
    pub fn new(metadata: SessionMetadata) -> Self {
        Self { metadata }
    }

    /// Read the document, resolve `model_name` against the config's known
    /// connections, and build the `Loaded` session that replaces this
    /// placeholder in `SessionList` (the replace itself is the caller's
    /// job — see `SessionList::replace_at`).
    pub fn load(&self, fileio: &SessionFileIO, config: &dyn ConfigProvider) -> Result<LoadedSession, LoadError> {
        let path = fileio.path_for(&self.metadata.fid);
        let document = fileio.read(&path).map_err(|source| match source {
            loom_fileio::IoError::Empty => LoadError::NotFound {
                fid: self.metadata.fid.clone(),
            },
            other => LoadError::Corrupt {
                fid: self.metadata.fid.clone(),
                source: other,
            },
        })?;

        let model_usage = resolve_model_usage(&self.metadata.model_name, config)?;
        // `from_messages` only keeps the stream open when the tail is an
        // open-stream role, so passing `true` unconditionally here is safe:
        // a closed tail stays Idle regardless.
        let log = MessageLog::from_messages(document.messages, true);
        let is_running = log.is_streaming();

        Ok(LoadedSession {
            store_id: Some(self.metadata.id),
            fid: self.metadata.fid.clone(),
            updated_at: self.metadata.updated_at,
            title: self.metadata.title.clone(),
            agent_name: self.metadata.agent_name.clone(),
            model_usage,
            total_tokens: self.metadata.total_tokens,
            duration_seconds: self.metadata.duration_seconds,
            log,
            agent: None,
            is_running,
            is_active: false,
            unread_count: 0,
        })
    }
}

/// Look up `model_name` in the config's connection catalog; fall back to
/// the default connection with a bare `ModelUsage` if not found. Errors
/// only when even the default connection is unconfigured.
pub fn resolve_model_usage(model_name: &str, config: &dyn ConfigProvider) -> Result<ModelUsage, LoadError> {
    for connection in config.connections() {
        if let Some(info) = connection.models.iter().find(|m| m.model_name == model_name) {
            let mut usage = ModelUsage::new(connection.connection_id.clone(), model_name.to_string());
            usage.model_caps.supports_thinking = info.supports_thinking;
            return Ok(usage);
        }
    }
    let default = config.default_model_usage();
    if default.connection_id.is_empty() {
        return Err(LoadError::UnresolvableModel {
            model_name: model_name.to_string(),
        });
    }
    Ok(ModelUsage::new(default.connection_id, model_name.to_string()))
}

/// A fully materialized session: its own `MessageLog` and, lazily, an
/// `Agent`.
pub struct LoadedSession {
    pub store_id: Option<i64>,
    pub fid: String,
    pub updated_at: i64,
    pub title: String,
    pub agent_name: String,
    pub model_usage: ModelUsage,
    pub total_tokens: i64,
    pub duration_seconds: i64,
    pub log: MessageLog,
    pub agent: Option<Box<dyn loom_core::Agent>>,
    pub is_running: bool,
    pub is_active: bool,
    pub unread_count: u64,
}

impl LoadedSession {
    pub fn activate(&mut self) {
        self.is_active = true;
        self.unread_count = 0;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Cancel the in-flight `ChatCall`, if any. Idempotent: calling twice
    /// has the same observable effect as once (the token itself is
    /// idempotent, and `is_running` simply stays false).
    pub fn cancel(&mut self) {
        if let Some(agent) = &self.agent {
            agent.chat_call().cancel();
        }
        self.is_running = false;
    }

    /// `activate_agent(name)`: a no-op if `name` already
    /// matches; otherwise builds a new agent and, if one existed, carries
    /// its `ChatCall` over so in-flight context survives the swap. Returns
    /// whether the swap actually happened (so the caller knows whether to
    /// emit `agent_activated`).
    pub fn activate_agent(&mut self, name: &str, factory: &dyn AgentFactory, tool_names: Vec<String>) -> bool {
        if name == self.agent_name {
            return false;
        }
        let mut new_agent = factory.create(&self.model_usage, tool_names);
        if let Some(old) = &self.agent {
            new_agent.replace_chat_call(old.chat_call().clone());
        }
        self.agent = Some(new_agent);
        self.agent_name = name.to_string();
        true
    }

    /// `activate_model(usage)`: config options overlay the
    /// requested usage (config wins), then the live `ChatCall` (if any) is
    /// updated in place.
    pub fn activate_model(&mut self, usage: ModelUsage, config: &dyn ConfigProvider) {
        let overlay = config.model_options(&usage.model_name);
        let usage = usage.with_overlaid_options(&overlay);
        self.model_usage = usage.clone();
        if let Some(agent) = &mut self.agent {
            agent.chat_call_mut().apply_model_usage(&usage);
        }
    }

    /// `send(msg)`. Non-`user` messages append and relay
    /// directly. A `user` message gets a `user-sent` display twin, then is
    /// handed to the (lazily constructed) agent for the request cycle.
    pub async fn send(
        &mut self,
        msg: Message,
        factory: &dyn AgentFactory,
        tool_names: Vec<String>,
        mut relay: impl FnMut(StreamEvent),
    ) -> Result<(), crate::error::SessionError> {
        if msg.role != Role::User {
            self.log.append(msg.clone());
            relay(StreamEvent::Message(msg));
            return Ok(());
        }

        let user_sent = Message::new(Role::UserSent, msg.content.clone());
        self.log.append(user_sent.clone());
        relay(StreamEvent::Message(user_sent));

        if self.agent.is_none() {
            self.agent = Some(factory.create(&self.model_usage, tool_names));
        }
        self.is_running = true;

        let history: Vec<Message> = self.log.iter_persistable().cloned().collect();
        let cancel = self
            .agent
            .as_ref()
            .expect("agent ensured above")
            .chat_call()
            .cancellation_token
            .clone();

        let mut sink = SessionSink {
            log: &mut self.log,
            is_active: self.is_active,
            unread_count: &mut self.unread_count,
            relay: &mut relay,
        };

        let result = self
            .agent
            .as_mut()
            .expect("agent ensured above")
            .send_async(history, msg, &mut sink, cancel)
            .await;

        self.is_running = false;
        result.map_err(crate::error::SessionError::from)
    }

    /// `save`: updates `updated_at`, recomputes
    /// `total_messages`, writes to the store (allocating an id on first
    /// save) and then to the document file. A session with zero
    /// visible-persisted messages is never written.
    /// Persistence failures are logged, never propagated — the in-memory
    /// state is always the source of truth for the next attempt.
    pub fn save(&mut self, store: &SessionStore, fileio: &SessionFileIO, touch_updated_at: bool) {
        let total_messages = self.log.count_toward_total_messages();
        if total_messages == 0 {
            return;
        }
        if touch_updated_at {
            let now = chrono::Utc::now().timestamp();
            self.duration_seconds += (now - self.updated_at).max(0);
            self.updated_at = now;
        }

        let metadata = SessionMetadata {
            id: self.store_id.unwrap_or(0),
            fid: self.fid.clone(),
            updated_at: self.updated_at,
            title: self.title.clone(),
            model_name: self.model_usage.model_name.clone(),
            agent_name: self.agent_name.clone(),
            total_messages,
            total_tokens: self.total_tokens,
            duration_seconds: self.duration_seconds,
        };

        match self.store_id {
            Some(id) => {
                if let Err(error) = store.update_by_id(id, &metadata) {
                    warn!(fid = %self.fid, %error, "session metadata update failed");
                }
            }
            None => match store.insert(&metadata) {
                Ok(new_id) => self.store_id = Some(new_id),
                Err(error) => warn!(fid = %self.fid, %error, "session metadata insert failed"),
            },
        }

        let document = loom_fileio::SessionDocument {
            id: self.store_id.unwrap_or(0),
            fid: self.fid.clone(),
            updated_at: self.updated_at,
            title: self.title.clone(),
            model_usage: self.model_usage.clone(),
            agent_name: self.agent_name.clone(),
            total_messages,
            total_tokens: self.total_tokens,
            duration_seconds: self.duration_seconds,
            child_chats: serde_json::Value::Array(Vec::new()),
            messages: self.log.messages().to_vec(),
        };
        if let Err(error) = fileio.write(&document) {
            warn!(fid = %self.fid, %error, "session document write failed; metadata already saved to store");
        }
    }
}

/// Read-only summary for UI display, uniform across all three variants.
#[derive(Debug, Clone)]
pub struct SessionDisplayInfo {
    pub id: Option<i64>,
    pub fid: Option<String>,
    pub title: String,
    pub model_name: String,
    pub agent_name: String,
    pub total_messages: i64,
    pub is_running: bool,
    pub unread_count: u64,
}

/// The closed set of session states, dispatched through a
/// tagged enum rather than inheritance.
pub enum Session {
    Empty(EmptySession),
    Placeholder(SessionPlaceholder),
    Loaded(LoadedSession),
}

impl Session {
    /// `None` for `Empty` and for a `Loaded` session not yet given a store
    /// id by its first `save` (id is allocated by the store).
    pub fn id(&self) -> Option<i64> {
        match self {
            Session::Empty(_) => None,
            Session::Placeholder(p) => Some(p.metadata.id),
            Session::Loaded(l) => l.store_id,
        }
    }

    pub fn fid(&self) -> Option<&str> {
        match self {
            Session::Empty(_) => None,
            Session::Placeholder(p) => Some(p.metadata.fid.as_str()),
            Session::Loaded(l) => Some(l.fid.as_str()),
        }
    }

    pub fn agent_name(&self) -> &str {
        match self {
            Session::Empty(e) => &e.agent_name,
            Session::Placeholder(p) => &p.metadata.agent_name,
            Session::Loaded(l) => &l.agent_name,
        }
    }

    pub fn model_usage(&self) -> ModelUsage {
        match self {
            Session::Empty(e) => e.model_usage.clone(),
            Session::Placeholder(p) => ModelUsage::new(String::new(), p.metadata.model_name.clone()),
            Session::Loaded(l) => l.model_usage.clone(),
        }
    }

    pub fn display_info(&self) -> SessionDisplayInfo {
        match self {
            Session::Empty(e) => SessionDisplayInfo {
                id: None,
                fid: None,
                title: String::new(),
                model_name: e.model_usage.model_name.clone(),
                agent_name: e.agent_name.clone(),
                total_messages: 0,
                is_running: false,
                unread_count: 0,
            },
            Session::Placeholder(p) => SessionDisplayInfo {
                id: Some(p.metadata.id),
                fid: Some(p.metadata.fid.clone()),
                title: p.metadata.title.clone(),
                model_name: p.metadata.model_name.clone(),
                agent_name: p.metadata.agent_name.clone(),
                total_messages: p.metadata.total_messages,
                is_running: false,
                unread_count: 0,
            },
            Session::Loaded(l) => SessionDisplayInfo {
                id: l.store_id,
                fid: Some(l.fid.clone()),
                title: l.title.clone(),
                model_name: l.model_usage.model_name.clone(),
                agent_name: l.agent_name.clone(),
                total_messages: l.log.count_toward_total_messages(),
                is_running: l.is_running,
                unread_count: l.unread_count,
            },
        }
    }

    pub fn activate(&mut self) {
        if let Session::Loaded(l) = self {
            l.activate();
        }
    }

    pub fn deactivate(&mut self) {
        if let Session::Loaded(l) = self {
            l.deactivate();
        }
    }

    /// No-op for `Empty`/`Placeholder`; idempotent for `Loaded`.
    pub fn cancel(&mut self) {
        if let Session::Loaded(l) = self {
            l.cancel();
        }
    }

    pub fn save(&mut self, store: &SessionStore, fileio: &SessionFileIO, touch_updated_at: bool) {
        if let Session::Loaded(l) = self {
            l.save(store, fileio, touch_updated_at);
        }
    }
}
