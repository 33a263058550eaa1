use crate::message::Role;

/// The state a single assistant response cycles through, shared by
/// [`crate::ChatCall`] (the request's own view) and the session's message
/// log (which owns the transition back to `Idle`; see design notes on
/// modeling "chunks mutate a message in place" as an explicit sum type).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming {
        role: Role,
        accumulated: String,
    },
}

impl StreamState {
    pub fn is_streaming(&self) -> bool {
        matches!(self, StreamState::Streaming { .. })
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            StreamState::Streaming { role, .. } => Some(*role),
            StreamState::Idle => None,
        }
    }
}
