//! Model provider abstraction layer for sentinel
//!
//! This crate provides provider-agnostic types for talking to chat-completion
//! models:
//!
//! - Message types for the conversation
//! - Completion request/response types
//! - Provider trait for model implementations
//! - An OpenAI-compatible provider (behind the `openai` feature)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;

#[cfg(feature = "openai")]
pub mod providers;
