//! General conversation when no ticker is in scope

use tracing::instrument;

use crate::error::Result;
use crate::llm::{ModelClient, Prompt};
use crate::prompts::CHAT_SYSTEM;
use crate::request::{AnalyzeRequest, ConversationTurn};
use crate::response::AnalyzeResponse;

const TEMPERATURE: f32 = 0.7;
const HISTORY_TURNS: usize = 6;

pub struct ChatAssistant {
    llm: ModelClient,
}

impl ChatAssistant {
    pub fn new(llm: ModelClient) -> Self {
        Self { llm }
    }

    #[instrument(skip_all)]
    pub async fn answer(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        let prompt = Prompt::new(CHAT_SYSTEM, TEMPERATURE)
            .messages(
                request
                    .recent_history(HISTORY_TURNS)
                    .iter()
                    .map(ConversationTurn::to_message),
            )
            .user(&request.query);

        Ok(AnalyzeResponse::general(self.llm.complete(prompt).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_chat_replays_last_six_turns() {
        let provider = Arc::new(ScriptedProvider::new(["A P/E ratio compares price to earnings."]));
        let history = (0..9)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationTurn::user(format!("u{i}"))
                } else {
                    ConversationTurn::assistant(format!("a{i}"))
                }
            })
            .collect();
        let request = AnalyzeRequest::new("what is a P/E ratio?").with_history(history);

        let response = ChatAssistant::new(provider.client()).answer(&request).await.unwrap();
        assert_eq!(response.synthesis, "A P/E ratio compares price to earnings.");

        let requests = provider.requests();
        let sent = &requests[0];
        assert_eq!(sent.temperature, Some(TEMPERATURE));
        assert_eq!(sent.messages.len(), HISTORY_TURNS + 1);
        assert_eq!(sent.messages[0].content, "a3");
        assert_eq!(sent.messages[HISTORY_TURNS].content, "what is a P/E ratio?");
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let provider = Arc::new(ScriptedProvider::failing());
        let result = ChatAssistant::new(provider.client())
            .answer(&AnalyzeRequest::new("hello"))
            .await;
        assert!(result.is_err());
    }
}
