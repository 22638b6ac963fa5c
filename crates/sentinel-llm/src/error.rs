//! Error types for model operations

use thiserror::Error;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Failures talking to a model provider
#[derive(Error, Debug)]
pub enum LLMError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<sentinel_utils::EnvError> for LLMError {
    fn from(err: sentinel_utils::EnvError) -> Self {
        Self::ConfigurationError(err.to_string())
    }
}
