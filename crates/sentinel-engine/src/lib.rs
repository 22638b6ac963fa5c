//! Financial query orchestration engine
//!
//! A free-text query is resolved to an intent and a ticker, then routed to
//! one of three paths:
//!
//! - Ticker analysis: a fixed graph gathers market data, runs technical,
//!   fundamental and sentiment analysts in parallel, and a supervisor fuses
//!   their reports into one validated trading decision
//! - Portfolio questions, answered from the caller's holdings
//! - General chat
//!
//! Holdings lookups ("how many NVDA shares do I own?") short-circuit to a
//! computed position summary without any model call.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sentinel_engine::{AnalyzeRequest, LiveMarketData, Orchestrator, SentinelConfig, new_trace_id};
//! use sentinel_llm::providers::OpenAIProvider;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SentinelConfig::from_env()?;
//!     let data = Arc::new(LiveMarketData::new(&config)?);
//!     let provider = Arc::new(OpenAIProvider::from_env()?);
//!     let orchestrator = Orchestrator::new(provider, data, config)?;
//!
//!     let outcome = orchestrator
//!         .analyze(&AnalyzeRequest::new("Analyze AAPL"), &new_trace_id())
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&outcome)?);
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod cache;
pub mod config;
pub mod data;
pub mod decision;
pub mod error;
pub mod graph;
pub mod llm;
pub mod portfolio;
pub mod prompts;
pub mod rate_limit;
pub mod request;
pub mod resolver;
pub mod response;
pub mod service;
pub mod state;
pub mod stream;

#[cfg(test)]
mod test_support;

pub use config::SentinelConfig;
pub use data::{LiveMarketData, MarketDataProvider, MarketSnapshot};
pub use decision::{Action, Confidence, Decision};
pub use error::{Result, SentinelError};
pub use graph::{AnalysisGraph, AnalysisNode, GraphObserver, NodeKind, ReportKind};
pub use portfolio::Holding;
pub use request::{AnalyzeRequest, ConversationTurn};
pub use resolver::{EntityResolver, Resolution, ResolutionMethod};
pub use response::{AnalyzeOutcome, AnalyzeResponse, HoldingsResponse, ResponseType};
pub use service::{Orchestrator, new_trace_id};
pub use state::{AnalysisState, Intent, StatePatch};
pub use stream::{StatusUpdate, StreamEvent};
