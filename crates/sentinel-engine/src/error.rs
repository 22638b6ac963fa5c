//! Error types for the orchestration engine

use thiserror::Error;

use crate::decision::DecisionError;

/// Engine-level errors
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Model provider failure
    #[error("LLM error: {0}")]
    Llm(#[from] sentinel_llm::LLMError),

    /// Upstream data API returned an error
    #[error("API error: {0}")]
    ApiError(String),

    /// Invalid ticker symbol
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Call budget for an upstream source is exhausted
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Technical indicator calculation error
    #[error("Technical indicator error: {0}")]
    IndicatorError(String),

    /// Prompt template failed to compile or render
    #[error("Prompt error: {0}")]
    PromptError(#[from] minijinja::Error),

    /// Supervisor output did not match the decision schema
    #[error("Invalid decision: {0}")]
    InvalidDecision(#[from] DecisionError),

    /// A matcher pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, SentinelError>;

impl From<sentinel_utils::EnvError> for SentinelError {
    fn from(err: sentinel_utils::EnvError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
