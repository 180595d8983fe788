use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no active session")]
    NoActiveSession,

    #[error("session not found: {id}")]
    SessionNotFound { id: i64 },

    #[error("task not found: {id}")]
    TaskNotFound { id: String },

    #[error("invalid full-text query: {reason}")]
    InvalidFtsQuery { reason: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
