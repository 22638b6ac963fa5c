//! Response projections returned to callers

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decision::Decision;
use crate::portfolio::Holding;
use crate::state::AnalysisState;

/// Synthesis returned when the request path fails unexpectedly
pub const INTERNAL_ERROR_SYNTHESIS: &str =
    "I encountered an internal error while processing your analysis request.";

/// Which path produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    #[default]
    Analysis,
    General,
    HoldingsLookup,
}

/// Full analysis, portfolio answer or chat reply
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default, alias = "responseType")]
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(default, alias = "priceTarget", skip_serializing_if = "Option::is_none")]
    pub price_target: Option<String>,
    pub synthesis: String,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub catalysts: Vec<String>,
    #[serde(default, alias = "technicalReport", skip_serializing_if = "Option::is_none")]
    pub technical_report: Option<String>,
    #[serde(default, alias = "fundamentalReport", skip_serializing_if = "Option::is_none")]
    pub fundamental_report: Option<String>,
    #[serde(default, alias = "sentimentReport", skip_serializing_if = "Option::is_none")]
    pub sentiment_report: Option<String>,
    #[serde(default, alias = "stockInfo", skip_serializing_if = "Option::is_none")]
    pub stock_info: Option<Map<String, Value>>,
    #[serde(default)]
    pub decision: Option<Decision>,
    #[serde(default, alias = "traceId", skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl AnalyzeResponse {
    /// Free-text answer from the portfolio or chat path
    pub fn general(synthesis: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::General,
            synthesis: synthesis.into(),
            ..Self::default()
        }
    }

    /// Failure reply carrying the error text; still a well-formed body
    pub fn internal_error(error: impl std::fmt::Display, trace_id: impl Into<String>) -> Self {
        Self {
            synthesis: INTERNAL_ERROR_SYNTHESIS.to_string(),
            errors: vec![error.to_string()],
            trace_id: Some(trace_id.into()),
            ..Self::default()
        }
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

impl From<AnalysisState> for AnalyzeResponse {
    fn from(state: AnalysisState) -> Self {
        Self {
            response_type: ResponseType::Analysis,
            ticker: state.ticker,
            recommendation: Some(state.recommendation),
            confidence: Some(state.confidence),
            price_target: Some(state.price_target),
            synthesis: state.synthesis,
            risks: state.risks,
            catalysts: state.catalysts,
            technical_report: Some(state.technical_report),
            fundamental_report: Some(state.fundamental_report),
            sentiment_report: Some(state.sentiment_report),
            stock_info: Some(state.stock_info),
            decision: state.decision,
            trace_id: Some(state.trace_id),
            timings: Some(state.timings),
            errors: state.errors,
        }
    }
}

/// Position figures for the holdings fast path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingsResponse {
    pub response_type: ResponseType,
    pub ticker: String,
    #[serde(alias = "companyName")]
    pub company_name: String,
    #[serde(alias = "sharesHeld")]
    pub shares_held: f64,
    #[serde(alias = "currentPrice")]
    pub current_price: f64,
    #[serde(alias = "totalValue")]
    pub total_value: f64,
    #[serde(alias = "averageCost")]
    pub average_cost: f64,
    #[serde(alias = "unrealizedPlDollars")]
    pub unrealized_pl_dollars: f64,
    #[serde(alias = "unrealizedPlPercent")]
    pub unrealized_pl_percent: f64,
    #[serde(alias = "purchaseValue")]
    pub purchase_value: f64,
    pub timestamp: DateTime<Utc>,
}

impl HoldingsResponse {
    pub fn from_holding(holding: &Holding, timestamp: DateTime<Utc>) -> Self {
        Self {
            response_type: ResponseType::HoldingsLookup,
            ticker: holding.symbol.to_uppercase(),
            company_name: holding.display_name().to_string(),
            shares_held: holding.quantity,
            current_price: holding.price,
            total_value: holding.equity(),
            average_cost: holding.average_buy_price,
            unrealized_pl_dollars: holding.unrealized_pnl(),
            unrealized_pl_percent: holding.unrealized_pnl_pct(),
            purchase_value: holding.cost_basis(),
            timestamp,
        }
    }
}

/// Either response shape; serialized without a wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalyzeOutcome {
    Holdings(HoldingsResponse),
    Analysis(AnalyzeResponse),
}

impl AnalyzeOutcome {
    pub fn response_type(&self) -> ResponseType {
        match self {
            Self::Holdings(r) => r.response_type,
            Self::Analysis(r) => r.response_type,
        }
    }

    pub fn as_analysis(&self) -> Option<&AnalyzeResponse> {
        match self {
            Self::Analysis(r) => Some(r),
            Self::Holdings(_) => None,
        }
    }

    pub fn as_holdings(&self) -> Option<&HoldingsResponse> {
        match self {
            Self::Holdings(r) => Some(r),
            Self::Analysis(_) => None,
        }
    }
}

impl From<AnalyzeResponse> for AnalyzeOutcome {
    fn from(response: AnalyzeResponse) -> Self {
        Self::Analysis(response)
    }
}

impl From<HoldingsResponse> for AnalyzeOutcome {
    fn from(response: HoldingsResponse) -> Self {
        Self::Holdings(response)
    }
}
