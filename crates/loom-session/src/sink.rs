use loom_core::{ChatStats, Message, Role, StreamSink};

use crate::log::MessageLog;

/// What a [`SessionSink`] relays upward once it has updated the owning
/// session's bookkeeping. `Manager` turns these into its public signals
/// — this crate stays agnostic of the signal enum so it
/// doesn't need to depend on `loom-manager`.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Chunk {
        role: Role,
        text: String,
        done: bool,
        stats: Option<ChatStats>,
    },
    Message(Message),
}

/// Bridges an `Agent`'s [`StreamSink`] calls into a `LoadedSession`'s
/// `MessageLog`. While inactive, chunks still append to the log but
/// relay is suppressed and `unread_count` increments instead.
pub struct SessionSink<'a> {
    pub log: &'a mut MessageLog,
    pub is_active: bool,
    pub unread_count: &'a mut u64,
    pub relay: &'a mut dyn FnMut(StreamEvent),
}

impl<'a> SessionSink<'a> {
    fn deliver(&mut self, event: StreamEvent) {
        if self.is_active {
            (self.relay)(event);
        } else {
            *self.unread_count += 1;
        }
    }
}

impl<'a> StreamSink for SessionSink<'a> {
    fn on_chunk(&mut self, role: Role, text: &str, done: bool, stats: Option<ChatStats>) {
        if text.is_empty() {
            if done {
                if self.log.is_streaming() {
                    self.log.finalize_stream();
                } else {
                    // No stream was ever opened this cycle (a first-and-only
                    // chunk that arrives already done with no text), but the
                    // cycle still closes with exactly one `end-stream`.
                    self.log.append(Message::new(Role::EndStream, ""));
                }
            }
        } else {
            self.log.append_stream_chunk(role, text);
            if done {
                self.log.finalize_stream();
            }
        }
        self.deliver(StreamEvent::Chunk {
            role,
            text: text.to_string(),
            done,
            stats,
        });
    }

    fn on_message(&mut self, message: Message) {
        self.log.append(message.clone());
        self.deliver(StreamEvent::Message(message));
    }
}
