//! Structured supervisor decision and its validation

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Maximum number of risks or catalysts a decision may carry
pub const MAX_LIST_ITEMS: usize = 7;

/// Maximum number of key metrics a decision may carry
pub const MAX_KEY_METRICS: usize = 10;

/// Trading action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Hold,
    Sell,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conviction behind a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A number the decision leans on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetric {
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(default)]
    pub why_it_matters: String,
}

/// Attribution for data the decision used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
}

/// Validated supervisor decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub confidence: Confidence,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub price_target: Option<String>,
    #[serde(default)]
    pub time_horizon: Option<String>,
    pub thesis: String,
    pub risks: Vec<String>,
    #[serde(default)]
    pub catalysts: Vec<String>,
    #[serde(default)]
    pub position_sizing: Option<String>,
    #[serde(default)]
    pub key_metrics: Vec<KeyMetric>,
    #[serde(default)]
    pub sources_used: Vec<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict_reasoning: Option<String>,
}

/// Why a supervisor payload was rejected
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("output is not valid decision JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("thesis must not be empty")]
    EmptyThesis,

    #[error("risks must contain at least one item")]
    NoRisks,

    #[error("{field} has {count} items, at most {max} allowed")]
    TooManyItems {
        field: &'static str,
        count: usize,
        max: usize,
    },
}

impl Decision {
    /// Check the constraints serde cannot express
    pub fn validate(&self) -> Result<(), DecisionError> {
        if self.thesis.trim().is_empty() {
            return Err(DecisionError::EmptyThesis);
        }
        if self.risks.is_empty() {
            return Err(DecisionError::NoRisks);
        }
        check_len("risks", self.risks.len(), MAX_LIST_ITEMS)?;
        check_len("catalysts", self.catalysts.len(), MAX_LIST_ITEMS)?;
        check_len("key_metrics", self.key_metrics.len(), MAX_KEY_METRICS)?;
        Ok(())
    }
}

fn check_len(field: &'static str, count: usize, max: usize) -> Result<(), DecisionError> {
    if count > max {
        return Err(DecisionError::TooManyItems { field, count, max });
    }
    Ok(())
}

/// Remove a surrounding markdown code fence, if any.
///
/// A leading fence drops the whole first line (so ```` ```json ```` goes too);
/// a trailing fence is cut at its last occurrence.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut cleaned = raw.trim();
    if cleaned.starts_with("```") {
        cleaned = cleaned.split_once('\n').map_or("", |(_, rest)| rest);
    }
    if cleaned.ends_with("```") {
        if let Some(idx) = cleaned.rfind("```") {
            cleaned = &cleaned[..idx];
        }
    }
    cleaned.trim()
}

/// Parse and validate raw model output
pub fn parse_decision(raw: &str) -> Result<Decision, DecisionError> {
    let decision: Decision = serde_json::from_str(strip_code_fence(raw))?;
    decision.validate()?;
    Ok(decision)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(String::from))
}
