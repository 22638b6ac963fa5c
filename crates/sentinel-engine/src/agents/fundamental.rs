//! Fundamental analyst node

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::graph::{AnalysisNode, NodeKind};
use crate::llm::{ModelClient, Prompt};
use crate::prompts::{self, FUNDAMENTAL_SYSTEM, PromptLibrary, format_value};
use crate::state::{AnalysisState, StatePatch};

const TEMPERATURE: f32 = 0.1;

pub const NO_DATA_REPORT: &str = "Insufficient fundamental data available.";

#[derive(Serialize)]
struct Metric<'a> {
    name: &'a str,
    value: String,
}

#[derive(Serialize)]
struct FundamentalContext<'a> {
    company_name: &'a str,
    ticker: &'a str,
    sector: &'a str,
    market_cap: String,
    metrics: Vec<Metric<'a>>,
}

/// Reads the fundamentals map and writes `fundamental_report`
pub struct FundamentalAnalyst {
    llm: ModelClient,
    prompts: Arc<PromptLibrary>,
}

impl FundamentalAnalyst {
    pub fn new(llm: ModelClient, prompts: Arc<PromptLibrary>) -> Self {
        Self { llm, prompts }
    }
}

#[async_trait]
impl AnalysisNode for FundamentalAnalyst {
    fn kind(&self) -> NodeKind {
        NodeKind::FundamentalAnalysis
    }

    async fn run(&self, state: &AnalysisState) -> Result<StatePatch> {
        let symbol = state.symbol();
        if state.fundamentals.is_empty() {
            return Ok(StatePatch::fundamental(NO_DATA_REPORT)
                .with_message(format!("Fundamental analysis skipped for {symbol}: no data")));
        }

        let info = &state.stock_info;
        let ctx = FundamentalContext {
            company_name: info.get("name").and_then(Value::as_str).unwrap_or(symbol),
            ticker: symbol,
            sector: info.get("sector").and_then(Value::as_str).unwrap_or("Unknown"),
            market_cap: format_value(info.get("market_cap")),
            metrics: state
                .fundamentals
                .iter()
                .map(|(name, value)| Metric {
                    name,
                    value: format_value(Some(value)),
                })
                .collect(),
        };

        let user = self.prompts.render(prompts::FUNDAMENTAL, &ctx)?;
        let report = self
            .llm
            .complete(Prompt::new(FUNDAMENTAL_SYSTEM, TEMPERATURE).user(user))
            .await?;

        Ok(StatePatch::fundamental(report).with_message(format!("Fundamental analysis completed for {symbol}")))
    }

    fn degraded(&self, _state: &AnalysisState) -> StatePatch {
        StatePatch::fundamental(NO_DATA_REPORT)
    }
}
