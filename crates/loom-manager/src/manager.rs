use std::collections::HashMap;
use std::sync::Arc;

use tracing::{instrument, warn};

use loom_agent::TitleGenerator;
use loom_core::{AgentFactory, ConfigProvider, Message, ModelConnector, PermissionProvider, Role, Tool};
use loom_fileio::SessionFileIO;
use loom_session::{
    resolve_model_usage, EmptySession, LoadedSession, Session, SessionList, SessionPlaceholder, StreamEvent,
};
use loom_store::SessionStore;

use crate::error::ManagerError;
use crate::signal::{Signal, SignalBus};

const DEFAULT_AGENT_NAME: &str = "just-ask";

/// Which session `send`/`cancel`/display-info act on. `Empty` is never
/// inserted into `list` (it has no `fid` yet), so it is carried by value;
/// everything else already lives in `list` and is addressed by `fid`
/// rather than duplicated — `Session` owns a `MessageLog` and a boxed
/// `Agent`, neither of which is `Clone`, so there is exactly one owner.
enum Current {
    Empty(EmptySession),
    InList(String),
}

fn fresh_fid() -> String {
    chrono::Utc::now().format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// Top-level coordinator: owns the session list, the
/// current session, registered agent factories and tools, the default
/// model, and the public signal surface.
pub struct Manager {
    list: SessionList,
    current: Current,
    agent_factories: HashMap<String, Arc<dyn AgentFactory>>,
    tools: Arc<HashMap<String, Arc<dyn Tool>>>,
    connectors: HashMap<String, Arc<dyn ModelConnector>>,
    config: Arc<dyn ConfigProvider>,
    #[allow(dead_code)]
    permission_provider: Arc<dyn PermissionProvider>,
    store: SessionStore,
    fileio: SessionFileIO,
    signals: SignalBus,
}

impl Manager {
    pub fn new(
        store: SessionStore,
        fileio: SessionFileIO,
        config: Arc<dyn ConfigProvider>,
        permission_provider: Arc<dyn PermissionProvider>,
    ) -> Self {
        let default_model_usage = config.default_model_usage();
        Self {
            list: SessionList::new(),
            current: Current::Empty(EmptySession::new(DEFAULT_AGENT_NAME, default_model_usage)),
            agent_factories: HashMap::new(),
            tools: Arc::new(HashMap::new()),
            connectors: HashMap::new(),
            config,
            permission_provider,
            store,
            fileio,
            signals: SignalBus::default(),
        }
    }

    pub fn register_agent_factory(&mut self, name: impl Into<String>, factory: Arc<dyn AgentFactory>) {
        self.agent_factories.insert(name.into(), factory);
    }

    pub fn register_connector(&mut self, connection_id: impl Into<String>, connector: Arc<dyn ModelConnector>) {
        self.connectors.insert(connection_id.into(), connector);
    }

    pub fn set_tools(&mut self, tools: HashMap<String, Arc<dyn Tool>>) {
        self.tools = Arc::new(tools);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }

    pub fn session_list(&self) -> &SessionList {
        &self.list
    }

    /// The session the UI should render as "current". Always valid —
    /// `Empty` when nothing has been sent yet, otherwise the live entry
    /// held in `session_list`.
    pub fn current(&self) -> CurrentView<'_> {
        match &self.current {
            Current::Empty(empty) => CurrentView::Empty(empty),
            Current::InList(fid) => CurrentView::InList(
                self.list
                    .get_by_fid(fid)
                    .expect("current always points at a live list entry"),
            ),
        }
    }

    fn agent_factory(&self, name: &str) -> Result<&Arc<dyn AgentFactory>, ManagerError> {
        self.agent_factories.get(name).ok_or_else(|| ManagerError::AgentNotRegistered {
            name: name.to_string(),
        })
    }

    fn tool_names(&self) -> Vec<String> {
        self.tools
            .keys()
            .filter(|name| self.config.tool_enabled(name))
            .cloned()
            .collect()
    }

    /// Read the index and create a `Placeholder` for each row whose
    /// document exists and is non-empty and whose model is resolvable,
    /// skipping the rest.
    #[instrument(skip(self))]
    pub fn load_sessions(&mut self) -> Result<(), loom_store::StoreError> {
        let rows = self.store.select_all_ordered_by_updated_at_desc()?;
        for row in rows {
            if row.total_messages == 0 {
                continue;
            }
            if !self.fileio.document_exists_and_non_empty(&row.fid) {
                warn!(fid = %row.fid, "skipping row with missing or empty document");
                continue;
            }
            if resolve_model_usage(&row.model_name, self.config.as_ref()).is_err() {
                warn!(fid = %row.fid, model_name = %row.model_name, "skipping row with unresolvable model");
                continue;
            }
            self.list.insert(Session::Placeholder(SessionPlaceholder::new(row)));
        }
        Ok(())
    }

    /// `create_new_session()`: an `Empty` session
    /// inheriting the current session's `agent_name` and `model_usage`.
    pub fn create_new_session(&self) -> Session {
        let (agent_name, model_usage) = match self.current() {
            CurrentView::Empty(e) => (e.agent_name.clone(), e.model_usage.clone()),
            CurrentView::InList(s) => (s.agent_name().to_string(), s.model_usage()),
        };
        Session::Empty(EmptySession::new(agent_name, model_usage))
    }

    /// `switch_to_session(fid)`: deactivate current,
    /// `load()` the target if it is still a `Placeholder` (replacing it
    /// in place), point `current` at it, activate, emit
    /// `session_activated`. `fid` must already be present in
    /// `session_list` — `Manager` never hands out bare `Session` values
    /// for the UI to feed back in, only the list it already populated.
    #[instrument(skip(self))]
    pub fn switch_to_session(&mut self, fid: &str) -> Result<(), ManagerError> {
        if let Current::InList(current_fid) = &self.current {
            if let Some(session) = self.list.get_by_fid_mut(current_fid) {
                session.deactivate();
            }
        }

        let pos = self
            .list
            .position_of_fid(fid)
            .ok_or_else(|| ManagerError::UnknownFid { fid: fid.to_string() })?;

        if matches!(self.list.get_by_fid(fid), Some(Session::Placeholder(_))) {
            let loaded = match self.list.get_by_fid(fid) {
                Some(Session::Placeholder(placeholder)) => placeholder.load(&self.fileio, self.config.as_ref())?,
                _ => unreachable!("checked above"),
            };
            self.list.replace_at(pos, Session::Loaded(loaded));
        }

        self.current = Current::InList(fid.to_string());
        let id = self.list.get_by_fid_mut(fid).map(|session| {
            session.activate();
            session.id()
        });
        self.signals.emit(Signal::SessionActivated {
            id: id.flatten(),
            fid: Some(fid.to_string()),
        });
        Ok(())
    }

    /// Removes a session from the index, its document, and the in-memory
    /// list. If it was current, falls back to a fresh `Empty` inheriting
    /// its agent/model, matching `create_new_session`'s inheritance rule.
    #[instrument(skip(self))]
    pub fn remove_session(&mut self, fid: &str) -> Result<(), ManagerError> {
        let id = self
            .list
            .get_by_fid(fid)
            .and_then(|s| s.id())
            .ok_or_else(|| ManagerError::UnknownFid { fid: fid.to_string() })?;

        if let Some((_, _)) = self.list.remove_by_id(id) {
            if let Err(error) = self.store.delete_by_id(id) {
                warn!(fid, %error, "store row delete failed after in-memory removal");
            }
        }

        if matches!(&self.current, Current::InList(current_fid) if current_fid == fid) {
            self.current = Current::Empty(EmptySession::new(DEFAULT_AGENT_NAME, self.config.default_model_usage()));
        }

        self.signals.emit(Signal::SessionRemoved { id });
        Ok(())
    }

    /// `activate_agent(fid, name)`: delegates to
    /// the `Loaded` session, emitting `agent_activated` only if the swap
    /// actually happened.
    #[instrument(skip(self))]
    pub fn activate_agent(&mut self, fid: &str, name: &str) -> Result<(), ManagerError> {
        let factory = Arc::clone(self.agent_factory(name)?);
        let tool_names = self.tool_names();

        let session = self
            .list
            .get_by_fid_mut(fid)
            .ok_or_else(|| ManagerError::UnknownFid { fid: fid.to_string() })?;
        let loaded = match session {
            Session::Loaded(loaded) => loaded,
            _ => return Err(ManagerError::UnknownFid { fid: fid.to_string() }),
        };

        if loaded.activate_agent(name, factory.as_ref(), tool_names) {
            self.signals.emit(Signal::AgentActivated {
                fid: fid.to_string(),
                agent_name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Verifies the configured default model is actually served by its
    /// connection before the first
    /// message can be sent.
    #[instrument(skip(self))]
    pub async fn ensure_model_usage(&self) -> Result<(), ManagerError> {
        let usage = self.config.default_model_usage();
        let unresolvable = || ManagerError::DefaultModelUnresolvable {
            connection_id: usage.connection_id.clone(),
            model_name: usage.model_name.clone(),
        };
        let connector = self.connectors.get(&usage.connection_id).ok_or_else(unresolvable)?;
        let models = connector.list_models().await.map_err(|_| unresolvable())?;
        if models.iter().any(|m| m.model_name == usage.model_name) {
            Ok(())
        } else {
            Err(unresolvable())
        }
    }

    pub fn cancel(&mut self, fid: &str) {
        if let Some(session) = self.list.get_by_fid_mut(fid) {
            session.cancel();
        }
    }

    /// `send(msg)`: promotes `Empty` to `Loaded` on
    /// first use, delegates to the (now current) `Loaded` session, relays
    /// its `StreamEvent`s as `Signal`s, then triggers the save (and, if
    /// the title is still empty, title generation) regardless of whether
    /// the request cycle succeeded, failed, or was cancelled.
    #[instrument(skip(self, msg))]
    pub async fn send(&mut self, msg: Message) -> Result<(), ManagerError> {
        let fid = self.ensure_current_is_in_list();
        self.signals.emit(Signal::ChatSend {
            fid: fid.clone(),
            message: msg.clone(),
        });

        let agent_name = match self.list.get_by_fid(&fid) {
            Some(Session::Loaded(loaded)) => loaded.agent_name.clone(),
            _ => return Err(ManagerError::UnknownFid { fid }),
        };
        let factory = Arc::clone(self.agent_factory(&agent_name)?);
        let tool_names = self.tool_names();
        let signals = &self.signals;
        let relay_fid = fid.clone();

        let session = self
            .list
            .get_by_fid_mut(&fid)
            .ok_or_else(|| ManagerError::UnknownFid { fid: fid.clone() })?;
        let loaded = match session {
            Session::Loaded(loaded) => loaded,
            _ => return Err(ManagerError::UnknownFid { fid }),
        };

        let relay = move |event: StreamEvent| match event {
            StreamEvent::Chunk { role, text, done, stats } => {
                signals.emit(Signal::StreamChunk {
                    fid: relay_fid.clone(),
                    role,
                    text: text.clone(),
                    done,
                    stats: stats.clone(),
                });
                if !matches!(role, Role::ThinkStream) {
                    signals.emit(Signal::StreamContent {
                        fid: relay_fid.clone(),
                        text,
                        stats,
                    });
                }
            }
            StreamEvent::Message(message) => {
                let signal = if message.role == Role::Tool {
                    Signal::ToolMessage {
                        fid: relay_fid.clone(),
                        message,
                    }
                } else {
                    Signal::MessageAdded {
                        fid: relay_fid.clone(),
                        message,
                    }
                };
                signals.emit(signal);
            }
        };

        if msg.role == Role::User {
            signals.emit(Signal::StreamStart { fid: fid.clone() });
        }
        let result = loaded.send(msg, factory.as_ref(), tool_names, relay).await;

        self.finalize_send(&fid).await;
        result.map_err(ManagerError::from)
    }

    /// Promotes a current `Empty` session into `list` if needed and
    /// returns the fid `send` should now operate on.
    fn ensure_current_is_in_list(&mut self) -> String {
        match &self.current {
            Current::InList(fid) => fid.clone(),
            Current::Empty(empty) => {
                let fid = fresh_fid();
                let loaded = empty.promote(fid.clone());
                self.list.insert(Session::Loaded(loaded));
                self.current = Current::InList(fid.clone());
                if let Some(session) = self.list.get_by_fid_mut(&fid) {
                    session.activate();
                }
                self.signals.emit(Signal::SessionActivated {
                    id: None,
                    fid: Some(fid.clone()),
                });
                fid
            }
        }
    }

    /// Generates a title if still empty, then saves — the two steps the
    /// teacher's request cycle always runs last regardless of outcome.
    async fn finalize_send(&mut self, fid: &str) {
        let title_usage = self.config.title_model_usage();
        let title_connector = title_usage
            .as_ref()
            .and_then(|usage| self.connectors.get(&usage.connection_id))
            .map(Arc::as_ref);

        let title = match self.list.get_by_fid(fid) {
            Some(Session::Loaded(loaded)) if loaded.title.is_empty() => {
                Some(TitleGenerator::generate(loaded.log.messages(), title_usage.as_ref(), title_connector).await)
            }
            _ => None,
        };

        if let Some(session) = self.list.get_by_fid_mut(fid) {
            if let Session::Loaded(loaded) = session {
                if let Some(title) = title {
                    loaded.title = title;
                }
            }
            session.save(&self.store, &self.fileio, true);
        }
    }

    /// Pushes a configuration change into every live `Loaded` session
    /// without recreating its `ChatCall`:
    /// options are overlaid in place and tool sets are rebuilt against
    /// the now-current enabled set.
    #[instrument(skip(self))]
    pub fn propagate_config_changed(&mut self) {
        let tool_names = self.tool_names();
        let config = Arc::clone(&self.config);
        for session in self.list.iter_mut() {
            if let Session::Loaded(loaded) = session {
                let usage = loaded.model_usage.clone();
                loaded.activate_model(usage, config.as_ref());
                if let Some(agent) = &mut loaded.agent {
                    agent.rebuild_tools(&tool_names);
                }
            }
        }
    }
}

/// Borrowed view returned by `Manager::current` — a `Session` cannot be
/// returned by reference when it is `Empty` (there is nothing in `list`
/// to borrow), so callers match on this instead.
pub enum CurrentView<'a> {
    Empty(&'a EmptySession),
    InList(&'a Session),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use loom_agent::testing::AlwaysOkConnector;
    use loom_agent::SessionAgentFactory;
    use loom_core::{ConnectionInfo, DenyAllPermissions, ModelInfo, ModelUsage, OptionValue};

    struct FakeConfig {
        default: ModelUsage,
        tool_enabled: bool,
    }

    impl ConfigProvider for FakeConfig {
        fn connections(&self) -> Vec<ConnectionInfo> {
            vec![ConnectionInfo {
                connection_id: self.default.connection_id.clone(),
                models: vec![ModelInfo {
                    model_name: self.default.model_name.clone(),
                    supports_thinking: true,
                }],
            }]
        }
        fn model_options(&self, _model_name: &str) -> HashMap<String, OptionValue> {
            HashMap::new()
        }
        fn tool_enabled(&self, _tool_name: &str) -> bool {
            self.tool_enabled
        }
        fn default_model_usage(&self) -> ModelUsage {
            self.default.clone()
        }
        fn title_model_usage(&self) -> Option<ModelUsage> {
            None
        }
        fn subscribe_changed(&self) -> tokio::sync::broadcast::Receiver<()> {
            tokio::sync::broadcast::channel(1).1
        }
    }

    /// Returns the `TempDir` alongside `Manager` so its directory stays
    /// alive for the caller's test — `SessionFileIO` only stores the path.
    fn test_manager() -> (Manager, tempfile::TempDir) {
        let store = SessionStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let fileio = SessionFileIO::new(dir.path());
        let config: Arc<dyn ConfigProvider> = Arc::new(FakeConfig {
            default: ModelUsage::new("local", "llama3"),
            tool_enabled: true,
        });
        let mut manager = Manager::new(store, fileio, config, Arc::new(DenyAllPermissions));
        manager.register_agent_factory(
            DEFAULT_AGENT_NAME,
            Arc::new(SessionAgentFactory {
                connector: Arc::new(AlwaysOkConnector::default()),
                tool_registry: Arc::new(HashMap::new()),
                permission: Arc::new(DenyAllPermissions),
                system_prompt: None,
            }),
        );
        (manager, dir)
    }

    #[test]
    fn new_manager_starts_on_an_empty_current_session() {
        let (manager, _dir) = test_manager();
        assert!(matches!(manager.current(), CurrentView::Empty(_)));
        assert_eq!(manager.session_list().len(), 0);
    }

    #[tokio::test]
    async fn scenario_a_send_promotes_empty_to_loaded_and_becomes_current() {
        let (mut manager, _dir) = test_manager();
        let mut signals = manager.subscribe();

        manager
            .send(Message::new(Role::User, "hello there"))
            .await
            .unwrap();

        assert_eq!(manager.session_list().len(), 1);
        match manager.current() {
            CurrentView::InList(session) => {
                // user-sent + the final ui summary line; the think/content
                // stream segments, end-stream, and done markers don't count
                // (Role::counts_toward_total_messages).
                assert_eq!(session.display_info().total_messages, 2);
                assert!(session.id().is_some(), "save should have allocated a store id");
            }
            CurrentView::Empty(_) => panic!("current should have been promoted"),
        }

        let mut saw_activated = false;
        let mut saw_chat_send = false;
        let mut saw_stream_start = false;
        while let Ok(signal) = signals.try_recv() {
            match signal {
                Signal::SessionActivated { .. } => saw_activated = true,
                Signal::ChatSend { .. } => saw_chat_send = true,
                Signal::StreamStart { .. } => saw_stream_start = true,
                _ => {}
            }
        }
        assert!(saw_activated);
        assert!(saw_chat_send, "send() must emit chat_send once the message is accepted");
        assert!(saw_stream_start, "send() must emit stream_start before the request cycle begins");
    }

    #[tokio::test]
    async fn send_twice_reuses_the_same_current_session() {
        let (mut manager, _dir) = test_manager();
        manager.send(Message::new(Role::User, "first")).await.unwrap();
        let fid_after_first = match manager.current() {
            CurrentView::InList(session) => session.fid().unwrap().to_string(),
            CurrentView::Empty(_) => panic!("expected a loaded session"),
        };

        manager.send(Message::new(Role::User, "second")).await.unwrap();
        assert_eq!(manager.session_list().len(), 1);
        match manager.current() {
            CurrentView::InList(session) => assert_eq!(session.fid(), Some(fid_after_first.as_str())),
            CurrentView::Empty(_) => panic!("expected a loaded session"),
        }
    }

    #[tokio::test]
    async fn scenario_e_agent_swap_preserves_chat_call() {
        let (mut manager, _dir) = test_manager();
        manager.register_agent_factory(
            "other-agent",
            Arc::new(SessionAgentFactory {
                connector: Arc::new(AlwaysOkConnector::default()),
                tool_registry: Arc::new(HashMap::new()),
                permission: Arc::new(DenyAllPermissions),
                system_prompt: None,
            }),
        );

        manager.send(Message::new(Role::User, "hi")).await.unwrap();
        let fid = match manager.current() {
            CurrentView::InList(session) => session.fid().unwrap().to_string(),
            CurrentView::Empty(_) => panic!("expected a loaded session"),
        };

        manager.activate_agent(&fid, "other-agent").unwrap();
        match manager.current() {
            CurrentView::InList(session) => assert_eq!(session.agent_name(), "other-agent"),
            CurrentView::Empty(_) => panic!("expected a loaded session"),
        }
    }

    #[tokio::test]
    async fn create_new_session_inherits_current_agent_and_model() {
        let (mut manager, _dir) = test_manager();
        manager.send(Message::new(Role::User, "hi")).await.unwrap();

        let fresh = manager.create_new_session();
        assert!(matches!(fresh, Session::Empty(_)));
        assert_eq!(fresh.agent_name(), DEFAULT_AGENT_NAME);
        assert_eq!(fresh.model_usage().model_name, "llama3");
    }

    #[tokio::test]
    async fn remove_session_falls_back_to_empty_when_current_is_removed() {
        let (mut manager, _dir) = test_manager();
        manager.send(Message::new(Role::User, "hi")).await.unwrap();
        let fid = match manager.current() {
            CurrentView::InList(session) => session.fid().unwrap().to_string(),
            CurrentView::Empty(_) => panic!("expected a loaded session"),
        };

        manager.remove_session(&fid).unwrap();
        assert!(matches!(manager.current(), CurrentView::Empty(_)));
        assert_eq!(manager.session_list().len(), 0);
    }

    #[test]
    fn switch_to_session_errors_on_unknown_fid() {
        let (mut manager, _dir) = test_manager();
        assert!(matches!(
            manager.switch_to_session("2026-01-01-00-00-00"),
            Err(ManagerError::UnknownFid { .. })
        ));
    }

    #[tokio::test]
    async fn ensure_model_usage_succeeds_when_connector_serves_the_default_model() {
        let (mut manager, _dir) = test_manager();
        manager.register_connector(
            "local",
            Arc::new(AlwaysOkConnector {
                models: vec![ModelInfo {
                    model_name: "llama3".to_string(),
                    supports_thinking: true,
                }],
            }),
        );
        manager.ensure_model_usage().await.unwrap();
    }

    #[tokio::test]
    async fn ensure_model_usage_errors_when_connector_not_registered() {
        let (manager, _dir) = test_manager();
        assert!(manager.ensure_model_usage().await.is_err());
    }

    /// Scenario C, driven through `Manager` rather than `SessionList`
    /// directly: a placeholder produced by `load_sessions` replaces itself
    /// in place the first time it's switched to.
    #[tokio::test]
    async fn switch_to_session_promotes_a_placeholder_in_place() {
        let (mut manager, _dir) = test_manager();
        manager.send(Message::new(Role::User, "hello")).await.unwrap();
        let fid = match manager.current() {
            CurrentView::InList(session) => session.fid().unwrap().to_string(),
            CurrentView::Empty(_) => panic!("expected a loaded session"),
        };

        // Simulate a fresh process: drop the in-memory list/current and
        // repopulate from the store the way `load_sessions` does at startup.
        // `switch_to_session` must read the document back off disk and
        // replace the placeholder with a `Loaded` session at the same
        // position, exactly as `SessionPlaceholder::load` does when called
        // directly.
        manager.list = SessionList::new();
        manager.current = Current::Empty(EmptySession::new(DEFAULT_AGENT_NAME, manager.config.default_model_usage()));
        manager.load_sessions().unwrap();
        assert_eq!(manager.session_list().len(), 1);
        assert!(matches!(manager.session_list().get_by_fid(&fid), Some(Session::Placeholder(_))));

        manager.switch_to_session(&fid).unwrap();

        match manager.session_list().get_by_fid(&fid) {
            Some(Session::Loaded(loaded)) => {
                assert!(loaded.is_active);
                assert_eq!(loaded.log.iter_persistable().count(), loaded.log.count_toward_total_messages() as usize);
            }
            _ => panic!("expected a loaded session in place of the placeholder"),
        }
        match manager.current() {
            CurrentView::InList(session) => assert_eq!(session.fid(), Some(fid.as_str())),
            CurrentView::Empty(_) => panic!("expected current to follow the promoted session"),
        }
    }

    /// Scenario F: a config change propagates an option into the live
    /// `ChatCall` without recreating it, and rebuilds the enabled tool set.
    #[tokio::test]
    async fn propagate_config_changed_updates_live_chat_call_options_in_place() {
        let (mut manager, _dir) = test_manager();
        manager.send(Message::new(Role::User, "hi")).await.unwrap();
        let fid = match manager.current() {
            CurrentView::InList(session) => session.fid().unwrap().to_string(),
            CurrentView::Empty(_) => panic!("expected a loaded session"),
        };

        let mut overlay = HashMap::new();
        overlay.insert("temperature".to_string(), OptionValue::Number(0.2));
        // Swap in a config whose `model_options` returns the overlay so
        // `activate_model` actually has something to apply.
        struct OverlayConfig {
            inner: FakeConfig,
            overlay: HashMap<String, OptionValue>,
        }
        impl ConfigProvider for OverlayConfig {
            fn connections(&self) -> Vec<ConnectionInfo> {
                self.inner.connections()
            }
            fn model_options(&self, _model_name: &str) -> HashMap<String, OptionValue> {
                self.overlay.clone()
            }
            fn tool_enabled(&self, tool_name: &str) -> bool {
                self.inner.tool_enabled(tool_name)
            }
            fn default_model_usage(&self) -> ModelUsage {
                self.inner.default_model_usage()
            }
            fn title_model_usage(&self) -> Option<ModelUsage> {
                None
            }
            fn subscribe_changed(&self) -> tokio::sync::broadcast::Receiver<()> {
                tokio::sync::broadcast::channel(1).1
            }
        }
        manager.config = Arc::new(OverlayConfig {
            inner: FakeConfig {
                default: ModelUsage::new("local", "llama3"),
                tool_enabled: false,
            },
            overlay,
        });

        manager.propagate_config_changed();

        match manager.session_list().get_by_fid(&fid) {
            Some(Session::Loaded(loaded)) => {
                assert_eq!(loaded.model_usage.options["temperature"], OptionValue::Number(0.2));
                let agent = loaded.agent.as_ref().expect("agent created on first send");
                assert_eq!(agent.chat_call().options["temperature"], OptionValue::Number(0.2));
                assert!(agent.chat_call().tool_names.is_empty(), "tool_enabled is now false for every tool");
            }
            _ => panic!("expected a loaded session"),
        }
    }
}
