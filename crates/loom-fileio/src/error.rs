use thiserror::Error;

/// Document file read/write failure. On write failure the
/// caller still saves metadata to `SessionStore`; on read failure the
/// `Placeholder` is skipped at load time.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed session document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("document is empty")]
    Empty,
}

pub type Result<T> = std::result::Result<T, IoError>;
