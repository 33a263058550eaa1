pub mod document;
pub mod error;
pub mod fileio;

pub use document::SessionDocument;
pub use error::IoError;
pub use fileio::{path_for_fid, SessionFileIO};
