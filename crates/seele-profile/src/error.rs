use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("patch application failed: {0}")]
    PatchFailed(String),

    #[error("profile document missing required key: {0}")]
    MissingKey(&'static str),
}

pub type Result<T> = std::result::Result<T, ProfileError>;
