use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("LLM returned no choices")]
    EmptyResponse,

    #[error("unparsable background-call output: {0}")]
    UnparsableOutput(String),

    #[error("tool loop exceeded max iterations ({0})")]
    MaxIterationsExceeded(usize),
}

pub type Result<T> = std::result::Result<T, LlmError>;
