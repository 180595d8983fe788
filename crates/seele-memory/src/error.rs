use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("store error: {0}")]
    Store(#[from] seele_store::StoreError),

    #[error("profile error: {0}")]
    Profile(#[from] seele_profile::ProfileError),

    #[error("LLM error: {0}")]
    Llm(#[from] seele_llm::LlmError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no active session")]
    NoActiveSession,
}

pub type Result<T> = std::result::Result<T, MemoryError>;
