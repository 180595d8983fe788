use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] seele_store::StoreError),

    #[error("invalid time expression: {0}")]
    InvalidTimeExpression(String),

    #[error("task not found: {id}")]
    TaskNotFound { id: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
