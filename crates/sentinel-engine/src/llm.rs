//! Thin wrapper binding a provider to the configured model

use std::sync::Arc;

use sentinel_llm::{CompletionRequest, LLMProvider, Message};
use tracing::debug;

use crate::config::SentinelConfig;
use crate::error::Result;

/// One model call's prompt and sampling settings
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub json_mode: bool,
}

impl Prompt {
    pub fn new(system: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            messages: Vec::new(),
            temperature,
            json_mode: false,
        }
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn user(self, text: impl Into<String>) -> Self {
        self.message(Message::user(text))
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Provider handle shared by every node of a request
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
    max_tokens: usize,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &SentinelConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// Run one completion and return the assistant text
    pub async fn complete(&self, prompt: Prompt) -> Result<String> {
        let request = CompletionRequest::builder(&self.model)
            .system(prompt.system)
            .messages(prompt.messages)
            .max_tokens(self.max_tokens)
            .temperature(prompt.temperature)
            .json_mode(prompt.json_mode)
            .build();

        let response = self.provider.complete(request).await?;
        debug!(
            provider = self.provider.name(),
            output_tokens = response.usage.output_tokens,
            "completion received"
        );
        Ok(response.message.content)
    }
}

impl std::fmt::Debug for ModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClient")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}
