use loom_core::{ChatStats, Message, Role};

/// The public, UI-facing event surface. Session objects are
/// identified by `(id, fid)` rather than carried by value — a `Session`
/// owns non-`Clone` state (its `MessageLog`, its boxed `Agent`), so
/// observers that need the live session look it up through
/// `Manager::session_list` instead of receiving an owned copy.
#[derive(Debug, Clone)]
pub enum Signal {
    SessionActivated { id: Option<i64>, fid: Option<String> },
    SessionRemoved { id: i64 },
    AgentActivated { fid: String, agent_name: String },
    ChatSend { fid: String, message: Message },
    StreamStart { fid: String },
    StreamChunk {
        fid: String,
        role: Role,
        text: String,
        done: bool,
        stats: Option<ChatStats>,
    },
    /// Derived from `StreamChunk`: content-only chunks, convenient for UI
    /// consumers that don't render the thinking channel.
    StreamContent {
        fid: String,
        text: String,
        stats: Option<ChatStats>,
    },
    ToolMessage { fid: String, message: Message },
    MessageAdded { fid: String, message: Message },
}

/// Small in-process pub/sub owned by `Manager`, wrapping a `tokio::sync::
/// broadcast` channel with a typed `Signal` payload instead of a
/// serialized string, so subscribers get structured events directly.
pub struct SignalBus {
    sender: tokio::sync::broadcast::Sender<Signal>,
}

impl SignalBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Signal> {
        self.sender.subscribe()
    }

    /// Delivered synchronously with the mutation that triggered it
    ///; dropped silently if there are no
    /// subscribers, matching `broadcast`'s send semantics.
    pub fn emit(&self, signal: Signal) {
        let _ = self.sender.send(signal);
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(256)
    }
}
