use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("memory error: {0}")]
    Memory(#[from] seele_memory::MemoryError),

    #[error("store error: {0}")]
    Store(#[from] seele_store::StoreError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] seele_scheduler::SchedulerError),

    #[error("llm error: {0}")]
    Llm(#[from] seele_llm::LlmError),

    /// Structured tool-input error, surfaced back to the model as a
    /// `ToolResult::error` rather than propagated as a turn failure.
    #[error("tool error: {0}")]
    Tool(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
