//! `seele-scheduler` — the 10-second tick loop that claims due scheduled
//! tasks from the store and dispatches them through a caller-supplied
//! callback (the Conversation Driver, in the full process).

pub mod engine;
pub mod error;
pub mod types;

pub use engine::{SchedulerEngine, TaskCallback};
pub use error::{Result, SchedulerError};
pub use types::BootstrapTask;
