use thiserror::Error;

/// All I/O failures against the relational index collapse into this one
/// kind: callers log and continue, store failures never
/// crash the session loop.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("session not found: id={id}")]
    NotFound { id: i64 },
}

pub type Result<T> = std::result::Result<T, StoreError>;
