use thiserror::Error;

#[derive(Error, Debug)]
pub enum OfpptError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM rate limit or quota exceeded")]
    RateLimited,

    #[error("Failed to generate AI response: {0}")]
    Generation(#[source] Box<OfpptError>),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Profile error: {0}")]
    Profile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl OfpptError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// True for failures a user can reasonably retry (quota, network, upstream errors).
    ///
    /// A generation failure is retryable only when its cause is.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Generation(cause) => cause.is_retryable(),
            Self::RateLimited | Self::Llm(_) | Self::Http(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, OfpptError>;
