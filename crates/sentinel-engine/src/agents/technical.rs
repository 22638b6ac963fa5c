//! Technical analyst node

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::graph::{AnalysisNode, NodeKind};
use crate::llm::{ModelClient, Prompt};
use crate::prompts::{self, PromptLibrary, TECHNICAL_SYSTEM, format_optional};
use crate::state::{AnalysisState, StatePatch};

const TEMPERATURE: f32 = 0.1;

/// Report written when there are no indicators to read
pub const NO_DATA_REPORT: &str = "Insufficient price data for technical analysis.";

/// Indicator grid rendered into the prompt, in template order
const FIELDS: [&str; 17] = [
    "current_price",
    "sma_50",
    "sma_200",
    "ema_20",
    "rsi",
    "stoch_k",
    "macd",
    "macd_signal",
    "macd_hist",
    "atr",
    "bb_upper",
    "bb_lower",
    "kc_upper",
    "obv",
    "pivot_point",
    "r1",
    "s1",
];

/// Reads the indicator grid and writes `technical_report`
pub struct TechnicalAnalyst {
    llm: ModelClient,
    prompts: Arc<PromptLibrary>,
}

impl TechnicalAnalyst {
    pub fn new(llm: ModelClient, prompts: Arc<PromptLibrary>) -> Self {
        Self { llm, prompts }
    }
}

#[async_trait]
impl AnalysisNode for TechnicalAnalyst {
    fn kind(&self) -> NodeKind {
        NodeKind::TechnicalAnalysis
    }

    async fn run(&self, state: &AnalysisState) -> Result<StatePatch> {
        let symbol = state.symbol();
        let indicators = &state.technical_indicators;
        if indicators.is_empty() {
            return Ok(StatePatch::technical(NO_DATA_REPORT)
                .with_message(format!("Technical analysis skipped for {symbol}: no data")));
        }

        let mut ctx: BTreeMap<&str, String> = FIELDS
            .iter()
            .map(|&field| (field, format_optional(indicators.get(field).copied(), 2)))
            .collect();
        ctx.insert("ticker", symbol.to_string());

        let user = self.prompts.render(prompts::TECHNICAL, &ctx)?;
        debug!(ticker = %symbol, indicators = indicators.len(), "requesting technical report");
        let report = self
            .llm
            .complete(Prompt::new(TECHNICAL_SYSTEM, TEMPERATURE).user(user))
            .await?;

        Ok(StatePatch::technical(report).with_message(format!("Technical analysis completed for {symbol}")))
    }

    fn degraded(&self, _state: &AnalysisState) -> StatePatch {
        StatePatch::technical(NO_DATA_REPORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedProvider;

    fn analyst(provider: &Arc<ScriptedProvider>) -> TechnicalAnalyst {
        TechnicalAnalyst::new(provider.client(), Arc::new(PromptLibrary::new().unwrap()))
    }

    #[tokio::test]
    async fn test_missing_indicators_skip_model() {
        let provider = Arc::new(ScriptedProvider::failing());
        let patch = analyst(&provider)
            .run(&AnalysisState::new("AAPL", "q", "t"))
            .await
            .unwrap();

        assert_eq!(patch.technical_report.as_deref(), Some(NO_DATA_REPORT));
        assert_eq!(patch.messages, vec!["Technical analysis skipped for AAPL: no data"]);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_carries_indicator_values() {
        let provider = Arc::new(ScriptedProvider::new(["## TREND\nUp."]));
        let mut state = AnalysisState::new("NVDA", "q", "t");
        state.technical_indicators.insert("rsi".to_string(), 71.234);
        state.technical_indicators.insert("current_price".to_string(), 912.5);

        let patch = analyst(&provider).run(&state).await.unwrap();
        assert_eq!(patch.technical_report.as_deref(), Some("## TREND\nUp."));

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, Some(TEMPERATURE));
        let user = &requests[0].messages[0].content;
        assert!(user.contains("Analyze NVDA"));
        assert!(user.contains("RSI (14): 71.23"));
        assert!(user.contains("SMA 200: N/A"));
    }

    #[tokio::test]
    async fn test_model_failure_is_an_error() {
        let provider = Arc::new(ScriptedProvider::failing());
        let mut state = AnalysisState::new("NVDA", "q", "t");
        state.technical_indicators.insert("rsi".to_string(), 50.0);
        assert!(analyst(&provider).run(&state).await.is_err());
    }
}
