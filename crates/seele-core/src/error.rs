use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeeleError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("profile error: {0}")]
    Profile(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid time expression: {0}")]
    InvalidTimeExpression(String),

    #[error("request timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl SeeleError {
    /// Short error code, useful when surfacing errors to tool callers.
    pub fn code(&self) -> &'static str {
        match self {
            SeeleError::Config(_) => "CONFIG_ERROR",
            SeeleError::Database(_) => "DATABASE_ERROR",
            SeeleError::LlmProvider(_) => "LLM_PROVIDER_ERROR",
            SeeleError::Profile(_) => "PROFILE_ERROR",
            SeeleError::Serialization(_) => "SERIALIZATION_ERROR",
            SeeleError::Io(_) => "IO_ERROR",
            SeeleError::InvalidTimeExpression(_) => "INVALID_TIME_EXPRESSION",
            SeeleError::Timeout { .. } => "TIMEOUT",
            SeeleError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SeeleError>;
