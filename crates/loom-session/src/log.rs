use loom_core::{Message, Role, StreamState};

/// Ordered, append-only message sequence for one `Loaded` session
///.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    stream: StreamState,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct a log from a document's message history. If `is_running`
    /// and the tail is an open streaming message, the stream is presented
    /// back to the UI as live so a future `end-stream` closes it correctly
    ///.
    pub fn from_messages(messages: Vec<Message>, is_running: bool) -> Self {
        let stream = if is_running {
            match messages.last() {
                Some(m) if m.role.is_open_stream() => StreamState::Streaming {
                    role: m.role,
                    accumulated: m.content.clone(),
                },
                _ => StreamState::Idle,
            }
        } else {
            StreamState::Idle
        };
        Self { messages, stream }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_streaming()
    }

    pub fn stream_role(&self) -> Option<Role> {
        self.stream.role()
    }

    /// Append a complete, non-streaming message to the tail (`user-sent`,
    /// `assistant`, `ui`, `tool`, `done`).
    pub fn append(&mut self, mut message: Message) {
        message.ensure_timestamp();
        self.messages.push(message);
    }

    /// Append one chunk of a `think-stream`/`content-stream` response. If
    /// the current tail is already streaming the same role, the chunk
    /// concatenates onto it; otherwise (idle, or a polarity flip) a new
    /// streaming message is opened with no explicit `end-stream` between
    /// the two.
    pub fn append_stream_chunk(&mut self, role: Role, text: &str) {
        debug_assert!(role.is_open_stream(), "append_stream_chunk requires a streaming role");
        match &mut self.stream {
            StreamState::Streaming { role: cur_role, accumulated } if *cur_role == role => {
                accumulated.push_str(text);
                if let Some(last) = self.messages.last_mut() {
                    last.content.push_str(text);
                }
            }
            _ => {
                let mut message = Message::new(role, text);
                message.ensure_timestamp();
                self.messages.push(message);
                self.stream = StreamState::Streaming {
                    role,
                    accumulated: text.to_string(),
                };
            }
        }
    }

    /// Append `end-stream` and return to `Idle`. A no-op if no stream is
    /// open, so cancelling twice has the same observable effect as once.
    pub fn finalize_stream(&mut self) {
        if self.stream.is_streaming() {
            self.append(Message::new(Role::EndStream, ""));
            self.stream = StreamState::Idle;
        }
    }

    pub fn iter_persistable(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role.is_persistable())
    }

    /// Messages counted in `SessionMetadata.total_messages` — visible
    /// roles excluding `tool`.
    pub fn count_toward_total_messages(&self) -> i64 {
        self.messages
            .iter()
            .filter(|m| m.role.counts_toward_total_messages())
            .count() as i64
    }

    /// Count of completed assistant turns, for display: a discrete
    /// `assistant` message or a closed streamed response (marked by its
    /// `end-stream`, per the one-end-stream-per-cycle invariant).
    pub fn count_assistant_replies(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m.role, Role::Assistant | Role::EndStream))
            .count()
    }
}
