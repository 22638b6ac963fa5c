//! Inbound request shape

use serde::{Deserialize, Serialize};
use sentinel_llm::{Message, Role};

use crate::portfolio::Holding;

/// One prior turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// `"User: ..."` / `"Assistant: ..."` line used in folded context
    pub fn transcript_line(&self) -> String {
        let label = match self.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        };
        format!("{label}: {}", self.content)
    }

    pub fn to_message(&self) -> Message {
        Message::new(self.role, self.content.clone())
    }
}

/// Analysis request as received from a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Free-text question
    pub query: String,

    /// Explicit ticker override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,

    /// Caller's holdings
    #[serde(default, alias = "portfolioContext")]
    pub portfolio_context: Vec<Holding>,

    /// Prior turns, oldest first
    #[serde(default, alias = "conversationHistory")]
    pub conversation_history: Vec<ConversationTurn>,
}

impl AnalyzeRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_portfolio(mut self, holdings: Vec<Holding>) -> Self {
        self.portfolio_context = holdings;
        self
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.conversation_history = history;
        self
    }

    /// The last `n` turns, oldest first
    pub fn recent_history(&self, n: usize) -> &[ConversationTurn] {
        let start = self.conversation_history.len().saturating_sub(n);
        &self.conversation_history[start..]
    }

    /// Query with the last `window` turns appended under a context marker
    pub fn query_with_context(&self, window: usize) -> String {
        let recent = self.recent_history(window);
        if recent.is_empty() {
            return self.query.clone();
        }
        let lines: Vec<String> = recent.iter().map(ConversationTurn::transcript_line).collect();
        format!(
            "{}\n\n[Prior conversation context]\n{}",
            self.query,
            lines.join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_without_history_is_unchanged() {
        let request = AnalyzeRequest::new("analyze AAPL");
        assert_eq!(request.query_with_context(10), "analyze AAPL");
    }

    #[test]
    fn test_query_folds_recent_turns() {
        let history = (0..12)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationTurn::user(format!("q{i}"))
                } else {
                    ConversationTurn::assistant(format!("a{i}"))
                }
            })
            .collect();
        let request = AnalyzeRequest::new("and now?").with_history(history);

        let folded = request.query_with_context(10);
        assert!(folded.starts_with("and now?\n\n[Prior conversation context]\nUser: q2\n"));
        assert!(folded.ends_with("Assistant: a11"));
        assert!(!folded.contains("q0"));
    }

    #[test]
    fn test_request_deserializes_camel_case_aliases() {
        let request: AnalyzeRequest = serde_json::from_str(
            r#"{"query":"hi","portfolioContext":[{"symbol":"AAPL"}],"conversationHistory":[{"role":"user","content":"x"}]}"#,
        )
        .unwrap();
        assert_eq!(request.portfolio_context.len(), 1);
        assert_eq!(request.conversation_history[0].role, Role::User);
    }
}
