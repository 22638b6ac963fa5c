//! Graph nodes and the non-graph answer agents
//!
//! Every analyst renders a prompt from the gathered data, makes exactly one
//! model call and owns exactly one report. When its inputs are missing it
//! writes a fixed degraded report without calling the model.

pub mod chat;
pub mod fundamental;
pub mod ingest;
pub mod portfolio;
pub mod sentiment;
pub mod supervisor;
pub mod technical;

pub use chat::ChatAssistant;
pub use fundamental::FundamentalAnalyst;
pub use ingest::IngestNode;
pub use portfolio::PortfolioAnalyst;
pub use sentiment::SentimentAnalyst;
pub use supervisor::{LegacyParser, Supervisor, fallback_output, parse_legacy};
pub use technical::TechnicalAnalyst;
