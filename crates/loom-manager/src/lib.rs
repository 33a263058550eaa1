pub mod error;
pub mod manager;
pub mod signal;

pub use error::ManagerError;
pub use manager::{CurrentView, Manager};
pub use signal::{Signal, SignalBus};
