use thiserror::Error;

/// Synchronous, programmer-error style failures: an unregistered agent
/// name or an unknown `fid`. Propagated directly to the caller rather
/// than logged and swallowed.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("no session with fid {fid}")]
    UnknownFid { fid: String },

    #[error("agent {name} is not registered")]
    AgentNotRegistered { name: String },

    #[error("default model {model_name} does not exist on connection {connection_id}")]
    DefaultModelUnresolvable { connection_id: String, model_name: String },

    #[error(transparent)]
    Load(#[from] loom_session::LoadError),

    #[error(transparent)]
    Session(#[from] loom_session::SessionError),
}
