use seele_core::Role;
use serde::{Deserialize, Serialize};

/// A message held live in the `ContextWindow`. Carries its own timestamp so
/// summarization never needs to estimate one for trimmed messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowMessage {
    pub role: Role,
    pub text: String,
    pub timestamp: i64,
}

/// A summary reference held in the window's recent-summary compartment —
/// the window holds the id + text, not ownership of the `Summary` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentSummaryRef {
    pub id: i64,
    pub text: String,
}

/// Outcome of `MemoryManager::add_assistant_message`'s `maybe_summarize`.
#[derive(Debug, Clone)]
pub struct SummarizeOutcome {
    pub summary_id: i64,
    pub profile_updated: bool,
}
