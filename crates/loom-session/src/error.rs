use thiserror::Error;

/// `Placeholder.load` failures: surfaced as a single failed
/// switch, leaving the UI on its prior current session.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no document found for session {fid}")]
    NotFound { fid: String },

    #[error("document for session {fid} is corrupt: {source}")]
    Corrupt {
        fid: String,
        #[source]
        source: loom_fileio::IoError,
    },

    #[error("model {model_name} is not resolvable on any known connection")]
    UnresolvableModel { model_name: String },
}

/// Programmer-error style failures on a `Session` operation that the
/// variant in question does not support.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{operation} is not supported by this session's current state")]
    Unsupported { operation: &'static str },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Agent(#[from] loom_core::AgentError),
}
