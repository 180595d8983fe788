//! `seele-agent` — the two tools (`scheduled_task`, `search_memories`) and
//! the Conversation Driver that glues memory, retrieval, and the LLM's
//! tool-call loop into one per-turn path, shared between live turns and
//! scheduler-fired system turns.

pub mod driver;
pub mod error;
pub mod tools;

pub use driver::ConversationDriver;
pub use error::{AgentError, Result};
pub use tools::{scheduled_task::ScheduledTaskTool, search_memories::SearchMemoriesTool, Tool, ToolRegistry};
