//! `seele-memory` — the session-scoped `ContextWindow`, the `Retriever`
//! that pulls related long-term memory for a turn, and the `MemoryManager`
//! that orchestrates both against the store, profile, and LLM clients.

pub mod error;
pub mod manager;
pub mod retriever;
pub mod types;
pub mod window;

pub use error::{MemoryError, Result};
pub use manager::MemoryManager;
pub use retriever::{RetrievalResult, Retriever};
pub use types::{RecentSummaryRef, SummarizeOutcome, WindowMessage};
pub use window::ContextWindow;
