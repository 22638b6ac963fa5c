//! Per-request analysis state and the patches nodes produce

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::{MarketSnapshot, NewsArticle};
use crate::decision::Decision;
use crate::portfolio::Holding;
use crate::resolver::Resolution;

/// Routing classification of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    TickerAnalysis,
    PortfolioQa,
    HoldingsLookup,
    GenericChat,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TickerAnalysis => "TICKER_ANALYSIS",
            Self::PortfolioQa => "PORTFOLIO_QA",
            Self::HoldingsLookup => "HOLDINGS_LOOKUP",
            Self::GenericChat => "GENERIC_CHAT",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the supervisor writes, decision plus the flat mirrors
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SynthesisOutput {
    pub decision: Option<Decision>,
    pub recommendation: String,
    pub confidence: String,
    pub price_target: String,
    pub synthesis: String,
    pub risks: Vec<String>,
    pub catalysts: Vec<String>,
}

impl SynthesisOutput {
    /// Mirrors derived from a validated decision
    pub fn from_decision(decision: Decision) -> Self {
        Self {
            recommendation: decision.action.to_string(),
            confidence: decision.confidence.to_string(),
            price_target: decision.price_target.clone().unwrap_or_default(),
            synthesis: decision.thesis.clone(),
            risks: decision.risks.clone(),
            catalysts: decision.catalysts.clone(),
            decision: Some(decision),
        }
    }
}

/// Shared record threaded through the analysis graph for one request.
///
/// Gathered inputs are written once by ingestion. Each report has exactly
/// one writer. `messages`, `errors` and `timings` accumulate across nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisState {
    pub ticker: Option<String>,
    pub query: String,
    pub trace_id: String,
    pub intent: Intent,
    pub entity_resolution: Option<Resolution>,
    pub portfolio: Vec<Holding>,

    pub technical_indicators: BTreeMap<String, f64>,
    pub fundamentals: Map<String, Value>,
    pub stock_info: Map<String, Value>,
    pub news_articles: Vec<NewsArticle>,
    pub sentiment_scores: Map<String, Value>,
    pub position_context: Option<Holding>,

    pub technical_report: String,
    pub fundamental_report: String,
    pub sentiment_report: String,

    pub decision: Option<Decision>,
    pub recommendation: String,
    pub confidence: String,
    pub price_target: String,
    pub synthesis: String,
    pub risks: Vec<String>,
    pub catalysts: Vec<String>,

    pub messages: Vec<String>,
    pub errors: Vec<String>,
    pub timings: BTreeMap<String, f64>,
}

impl AnalysisState {
    /// Fresh state for an analysis of `ticker`
    pub fn new(ticker: impl Into<String>, query: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            ticker: Some(ticker.into().to_uppercase()),
            query: query.into(),
            trace_id: trace_id.into(),
            intent: Intent::TickerAnalysis,
            entity_resolution: None,
            portfolio: Vec::new(),
            technical_indicators: BTreeMap::new(),
            fundamentals: Map::new(),
            stock_info: Map::new(),
            news_articles: Vec::new(),
            sentiment_scores: Map::new(),
            position_context: None,
            technical_report: String::new(),
            fundamental_report: String::new(),
            sentiment_report: String::new(),
            decision: None,
            recommendation: String::new(),
            confidence: String::new(),
            price_target: String::new(),
            synthesis: String::new(),
            risks: Vec::new(),
            catalysts: Vec::new(),
            messages: Vec::new(),
            errors: Vec::new(),
            timings: BTreeMap::new(),
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.intent = resolution.intent;
        self.entity_resolution = Some(resolution);
        self
    }

    pub fn with_portfolio(mut self, portfolio: Vec<Holding>) -> Self {
        self.portfolio = portfolio;
        self
    }

    /// Ticker in scope, empty when none
    pub fn symbol(&self) -> &str {
        self.ticker.as_deref().unwrap_or_default()
    }

    /// Merge a node patch: overwrite owned fields, append accumulators
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(snapshot) = patch.snapshot {
            self.technical_indicators = snapshot.technical_indicators;
            self.fundamentals = snapshot.fundamentals;
            self.stock_info = snapshot.stock_info;
            self.news_articles = snapshot.news_articles;
            self.sentiment_scores = snapshot.sentiment_scores;
        }
        if let Some(position) = patch.position_context {
            self.position_context = Some(position);
        }
        if let Some(report) = patch.technical_report {
            self.technical_report = report;
        }
        if let Some(report) = patch.fundamental_report {
            self.fundamental_report = report;
        }
        if let Some(report) = patch.sentiment_report {
            self.sentiment_report = report;
        }
        if let Some(output) = patch.synthesis {
            self.decision = output.decision;
            self.recommendation = output.recommendation;
            self.confidence = output.confidence;
            self.price_target = output.price_target;
            self.synthesis = output.synthesis;
            self.risks = output.risks;
            self.catalysts = output.catalysts;
        }
        self.messages.extend(patch.messages);
        self.errors.extend(patch.errors);
        self.timings.extend(patch.timings);
    }
}

/// The subset of state a node produces
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatePatch {
    pub snapshot: Option<MarketSnapshot>,
    pub position_context: Option<Holding>,
    pub technical_report: Option<String>,
    pub fundamental_report: Option<String>,
    pub sentiment_report: Option<String>,
    pub synthesis: Option<SynthesisOutput>,
    pub messages: Vec<String>,
    pub errors: Vec<String>,
    pub timings: BTreeMap<String, f64>,
}

impl StatePatch {
    pub fn gathered(snapshot: MarketSnapshot, position_context: Option<Holding>) -> Self {
        Self {
            snapshot: Some(snapshot),
            position_context,
            ..Self::default()
        }
    }

    pub fn technical(report: impl Into<String>) -> Self {
        Self {
            technical_report: Some(report.into()),
            ..Self::default()
        }
    }

    pub fn fundamental(report: impl Into<String>) -> Self {
        Self {
            fundamental_report: Some(report.into()),
            ..Self::default()
        }
    }

    pub fn sentiment(report: impl Into<String>) -> Self {
        Self {
            sentiment_report: Some(report.into()),
            ..Self::default()
        }
    }

    pub fn synthesized(output: SynthesisOutput) -> Self {
        Self {
            synthesis: Some(output),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn with_timing(mut self, stage: impl Into<String>, seconds: f64) -> Self {
        self.timings.insert(stage.into(), seconds);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Action, Confidence};

    fn decision() -> Decision {
        Decision {
            action: Action::Sell,
            confidence: Confidence::Medium,
            price_target: None,
            time_horizon: Some("1-3 months".to_string()),
            thesis: "Momentum rolled over.".to_string(),
            risks: vec!["Short squeeze".to_string()],
            catalysts: vec![],
            position_sizing: None,
            key_metrics: vec![],
            sources_used: vec![],
            verdict_reasoning: None,
        }
    }

    #[test]
    fn test_new_uppercases_ticker() {
        let state = AnalysisState::new("aapl", "q", "t-1");
        assert_eq!(state.symbol(), "AAPL");
        assert_eq!(state.intent, Intent::TickerAnalysis);
    }

    #[test]
    fn test_apply_overwrites_owned_and_appends_accumulators() {
        let mut state = AnalysisState::new("AAPL", "q", "t-1");
        state.apply(
            StatePatch::technical("first")
                .with_message("one")
                .with_timing("technical_analysis", 1.0),
        );
        state.apply(
            StatePatch::technical("second")
                .with_message("two")
                .with_error("boom")
                .with_timing("fundamental_analysis", 2.0),
        );

        assert_eq!(state.technical_report, "second");
        assert_eq!(state.messages, vec!["one", "two"]);
        assert_eq!(state.errors, vec!["boom"]);
        assert_eq!(state.timings.len(), 2);
        assert!(state.fundamental_report.is_empty());
    }

    #[test]
    fn test_mirrors_follow_decision() {
        let output = SynthesisOutput::from_decision(decision());
        assert_eq!(output.recommendation, "SELL");
        assert_eq!(output.confidence, "MEDIUM");
        assert_eq!(output.price_target, "");
        assert_eq!(output.synthesis, "Momentum rolled over.");

        let mut state = AnalysisState::new("TSLA", "q", "t");
        state.apply(StatePatch::synthesized(output));
        assert_eq!(state.decision, Some(decision()));
        assert_eq!(state.risks, vec!["Short squeeze"]);
    }

    #[test]
    fn test_intent_wire_format() {
        assert_eq!(
            serde_json::to_string(&Intent::PortfolioQa).unwrap(),
            "\"PORTFOLIO_QA\""
        );
        let intent: Intent = serde_json::from_str("\"HOLDINGS_LOOKUP\"").unwrap();
        assert_eq!(intent, Intent::HoldingsLookup);
    }
}
