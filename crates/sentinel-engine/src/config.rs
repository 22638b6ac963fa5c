//! Engine configuration

use crate::error::{Result, SentinelError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by every component of a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Model identifier passed to the provider
    pub model: String,

    /// Token ceiling for every model call
    pub max_tokens: usize,

    /// Supervisor emits a schema-validated JSON decision instead of free text
    pub enable_structured_outputs: bool,

    /// Resolver may fall back to a model classification call
    pub enable_entity_resolution: bool,

    /// Lifetime of cached market data
    pub cache_ttl: Duration,

    /// Timeout for outbound data requests
    pub request_timeout: Duration,

    /// Finnhub API key (news, sentiment, profile, metrics)
    pub finnhub_api_key: Option<String>,

    /// NewsAPI key
    pub newsapi_api_key: Option<String>,

    /// Conversation turns folded into an analysis query
    pub history_window: usize,

    /// Characters kept in a streamed report preview
    pub preview_chars: usize,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 2048,
            enable_structured_outputs: true,
            enable_entity_resolution: true,
            cache_ttl: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
            finnhub_api_key: None,
            newsapi_api_key: None,
            history_window: 10,
            preview_chars: 100,
        }
    }
}

impl SentinelConfig {
    /// Create a new configuration builder
    pub fn builder() -> SentinelConfigBuilder {
        SentinelConfigBuilder::default()
    }

    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            model: sentinel_utils::env_var("OPENAI_MODEL").unwrap_or(defaults.model),
            max_tokens: sentinel_utils::env_parse("SENTINEL_MAX_TOKENS", defaults.max_tokens)?,
            enable_structured_outputs: sentinel_utils::env_flag(
                "ENABLE_STRUCTURED_OUTPUTS",
                defaults.enable_structured_outputs,
            )?,
            enable_entity_resolution: sentinel_utils::env_flag(
                "ENABLE_ENTITY_RESOLUTION",
                defaults.enable_entity_resolution,
            )?,
            cache_ttl: Duration::from_secs(sentinel_utils::env_parse(
                "SENTINEL_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            request_timeout: Duration::from_secs(sentinel_utils::env_parse(
                "SENTINEL_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            finnhub_api_key: sentinel_utils::env_var("FINNHUB_API_KEY"),
            newsapi_api_key: sentinel_utils::env_var("NEWSAPI_API_KEY"),
            history_window: defaults.history_window,
            preview_chars: defaults.preview_chars,
        };

        config.validate()?;
        config.warn_missing_sources();
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(SentinelError::ConfigError(
                "model must not be empty".to_string(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(SentinelError::ConfigError(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.history_window == 0 || self.preview_chars == 0 {
            return Err(SentinelError::ConfigError(
                "history_window and preview_chars must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn warn_missing_sources(&self) {
        if self.finnhub_api_key.is_none() {
            tracing::warn!("FINNHUB_API_KEY not set; news, sentiment and fundamentals will be empty");
        }
        if self.newsapi_api_key.is_none() {
            tracing::warn!("NEWSAPI_API_KEY not set; NewsAPI headlines disabled");
        }
    }
}

/// Builder for SentinelConfig
#[derive(Debug, Default)]
pub struct SentinelConfigBuilder {
    model: Option<String>,
    max_tokens: Option<usize>,
    enable_structured_outputs: Option<bool>,
    enable_entity_resolution: Option<bool>,
    cache_ttl: Option<Duration>,
    request_timeout: Option<Duration>,
    finnhub_api_key: Option<String>,
    newsapi_api_key: Option<String>,
    history_window: Option<usize>,
    preview_chars: Option<usize>,
}

impl SentinelConfigBuilder {
    /// Set the model identifier
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the token ceiling per model call
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Toggle structured supervisor output
    pub fn structured_outputs(mut self, enabled: bool) -> Self {
        self.enable_structured_outputs = Some(enabled);
        self
    }

    /// Toggle the model fallback in intent resolution
    pub fn entity_resolution(mut self, enabled: bool) -> Self {
        self.enable_entity_resolution = Some(enabled);
        self
    }

    /// Set the market data cache lifetime
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Set outbound request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the Finnhub API key
    pub fn finnhub_api_key(mut self, key: impl Into<String>) -> Self {
        self.finnhub_api_key = Some(key.into());
        self
    }

    /// Set the NewsAPI key
    pub fn newsapi_api_key(mut self, key: impl Into<String>) -> Self {
        self.newsapi_api_key = Some(key.into());
        self
    }

    /// Set how many conversation turns are folded into the query
    pub fn history_window(mut self, turns: usize) -> Self {
        self.history_window = Some(turns);
        self
    }

    /// Set streamed preview length
    pub fn preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = Some(chars);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SentinelConfig> {
        let defaults = SentinelConfig::default();

        let config = SentinelConfig {
            model: self.model.unwrap_or(defaults.model),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            enable_structured_outputs: self
                .enable_structured_outputs
                .unwrap_or(defaults.enable_structured_outputs),
            enable_entity_resolution: self
                .enable_entity_resolution
                .unwrap_or(defaults.enable_entity_resolution),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            finnhub_api_key: self.finnhub_api_key,
            newsapi_api_key: self.newsapi_api_key,
            history_window: self.history_window.unwrap_or(defaults.history_window),
            preview_chars: self.preview_chars.unwrap_or(defaults.preview_chars),
        };

        config.validate()?;
        Ok(config)
    }
}
