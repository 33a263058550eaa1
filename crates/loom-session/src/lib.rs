pub mod error;
pub mod list;
pub mod log;
pub mod session;
pub mod sink;

pub use error::{LoadError, SessionError};
pub use list::{ListEvent, SessionList};
pub use log::MessageLog;
pub use session::{resolve_model_usage, EmptySession, LoadedSession, Session, SessionDisplayInfo, SessionPlaceholder};
pub use sink::{SessionSink, StreamEvent};
