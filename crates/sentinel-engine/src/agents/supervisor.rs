//! Supervisor node: fuses the three analyst reports into one decision
//!
//! In structured mode the model must return a schema-valid JSON decision.
//! A rejected answer gets exactly one repair attempt that carries the
//! failing output and the validation error back to the model; if that
//! also fails, the node writes a fixed HOLD/LOW fallback and records the
//! failure in `errors`. Legacy mode asks for a markdown report and pulls
//! the scalar fields out with regexes.

use std::sync::Arc;

use async_trait::async_trait;
use minijinja::context;
use regex::Regex;
use sentinel_llm::Message;
use tracing::{error, info, warn};

use crate::decision::{Decision, parse_decision};
use crate::error::Result;
use crate::graph::{AnalysisNode, NodeKind};
use crate::llm::{ModelClient, Prompt};
use crate::portfolio::Holding;
use crate::prompts::{self, PromptLibrary, SUPERVISOR_OUTPUT_FORMAT, SUPERVISOR_SYSTEM, format_dollars};
use crate::state::{AnalysisState, StatePatch, SynthesisOutput};

const TEMPERATURE: f32 = 0.1;

/// Holdings listed in the portfolio summary
const MAX_SUMMARY_HOLDINGS: usize = 10;

pub const FALLBACK_SYNTHESIS: &str = "Analysis could not be completed securely. Please try again.";
pub const FALLBACK_RISK: &str = "Automated analysis failed.";

const NO_PORTFOLIO: &str = "No portfolio context available.";

/// Deterministic output used when no valid decision could be produced
pub fn fallback_output() -> SynthesisOutput {
    SynthesisOutput {
        decision: None,
        recommendation: "HOLD".to_string(),
        confidence: "LOW".to_string(),
        price_target: String::new(),
        synthesis: FALLBACK_SYNTHESIS.to_string(),
        risks: vec![FALLBACK_RISK.to_string()],
        catalysts: Vec::new(),
    }
}

/// Extracts the scalar fields from a free-text legacy report
#[derive(Debug, Clone)]
pub struct LegacyParser {
    action: Regex,
    confidence: Regex,
    price_target: Regex,
    risks: Regex,
    catalysts: Regex,
    item: Regex,
}

impl LegacyParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            action: Regex::new(r"(?i)Action:\s*(BUY|HOLD|SELL)")?,
            confidence: Regex::new(r"(?i)Confidence:\s*(HIGH|MEDIUM|LOW)")?,
            price_target: Regex::new(r"(?i)12-Month Price Target:\s*\$?([\d,.]+)")?,
            risks: Regex::new(r"(?i)##\s*KEY RISKS")?,
            catalysts: Regex::new(r"(?i)##\s*KEY CATALYSTS")?,
            item: Regex::new(r"\n\s*\d+\.\s*(.+)")?,
        })
    }

    /// Scalars from `text`, with HOLD/MEDIUM defaults. The full text
    /// becomes the synthesis and no decision is attached.
    pub fn parse(&self, text: &str) -> SynthesisOutput {
        let capture = |re: &Regex| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_uppercase())
        };

        SynthesisOutput {
            decision: None,
            recommendation: capture(&self.action).unwrap_or_else(|| "HOLD".to_string()),
            confidence: capture(&self.confidence).unwrap_or_else(|| "MEDIUM".to_string()),
            price_target: capture(&self.price_target)
                .map(|target| format!("${target}"))
                .unwrap_or_default(),
            synthesis: text.to_string(),
            risks: self.numbered_items(text, &self.risks),
            catalysts: self.numbered_items(text, &self.catalysts),
        }
    }

    /// Numbered items between `header` and the next `##` heading
    fn numbered_items(&self, text: &str, header: &Regex) -> Vec<String> {
        let Some(found) = header.find(text) else {
            return Vec::new();
        };
        let rest = &text[found.end()..];
        let block = rest.find("\n##").map_or(rest, |end| &rest[..end]);
        self.item
            .captures_iter(block)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

/// Legacy extraction with a freshly compiled parser
pub fn parse_legacy(text: &str) -> Result<SynthesisOutput> {
    Ok(LegacyParser::new()?.parse(text))
}

/// A rejected attempt: the raw output, if the model answered, and why
struct Failure {
    raw: Option<String>,
    reason: String,
}

/// Writes the decision and its flat mirrors
pub struct Supervisor {
    llm: ModelClient,
    prompts: Arc<PromptLibrary>,
    structured: bool,
    legacy: LegacyParser,
}

impl Supervisor {
    pub fn new(llm: ModelClient, prompts: Arc<PromptLibrary>, structured: bool) -> Result<Self> {
        Ok(Self {
            llm,
            prompts,
            structured,
            legacy: LegacyParser::new()?,
        })
    }

    fn render_user(&self, state: &AnalysisState) -> Result<String> {
        let report = |text: &str, label: &str| {
            if text.trim().is_empty() {
                format!("{label} analysis unavailable.")
            } else {
                text.to_string()
            }
        };

        self.prompts.render(
            prompts::SUPERVISOR,
            context! {
                ticker => state.symbol(),
                technical_report => report(&state.technical_report, "Technical"),
                fundamental_report => report(&state.fundamental_report, "Fundamental"),
                sentiment_report => report(&state.sentiment_report, "Sentiment"),
                query => &state.query,
                portfolio_summary => portfolio_summary(&state.portfolio),
                position => state.position_context.as_ref().map(describe_position),
                legacy => !self.structured,
            },
        )
    }

    async fn attempt(&self, prompt: Prompt) -> std::result::Result<Decision, Failure> {
        let raw = self.llm.complete(prompt).await.map_err(|e| Failure {
            raw: None,
            reason: e.to_string(),
        })?;
        parse_decision(&raw).map_err(|e| Failure {
            raw: Some(raw),
            reason: e.to_string(),
        })
    }

    async fn synthesize_structured(&self, symbol: &str, user: String) -> Result<StatePatch> {
        let system = format!("{SUPERVISOR_SYSTEM}\n\n{SUPERVISOR_OUTPUT_FORMAT}");
        let prompt = Prompt::new(system, TEMPERATURE).user(user).json();

        let first = match self.attempt(prompt.clone()).await {
            Ok(decision) => return Ok(accepted(symbol, decision)),
            Err(failure) => failure,
        };
        warn!(ticker = %symbol, reason = %first.reason, "decision rejected, requesting repair");

        let note = self
            .prompts
            .render(prompts::REPAIR, context! { error => &first.reason })?;
        let mut repair = prompt;
        if let Some(raw) = first.raw {
            repair = repair.message(Message::assistant(raw));
        }
        let repair = repair.message(Message::system(note));

        match self.attempt(repair).await {
            Ok(decision) => {
                info!(ticker = %symbol, "decision accepted after repair");
                Ok(accepted(symbol, decision))
            }
            Err(second) => {
                error!(ticker = %symbol, reason = %second.reason, "repair failed, using fallback decision");
                Ok(StatePatch::synthesized(fallback_output())
                    .with_message("Supervisor analysis failed")
                    .with_error(format!("supervisor_parse_failed: {}", second.reason)))
            }
        }
    }
}

fn accepted(symbol: &str, decision: Decision) -> StatePatch {
    StatePatch::synthesized(SynthesisOutput::from_decision(decision))
        .with_message(format!("Structured synthesis completed for {symbol}"))
}

/// `SYM: qty shares @ $price` per holding, capped
pub fn portfolio_summary(holdings: &[Holding]) -> String {
    if holdings.is_empty() {
        return NO_PORTFOLIO.to_string();
    }
    holdings
        .iter()
        .take(MAX_SUMMARY_HOLDINGS)
        .map(|h| format!("{}: {} shares @ {}", h.symbol, h.quantity, format_dollars(h.price)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_position(holding: &Holding) -> String {
    format!(
        "{} shares, average cost {}, current price {}, unrealized P&L {} ({:.2}%)",
        holding.quantity,
        format_dollars(holding.average_buy_price),
        format_dollars(holding.price),
        format_dollars(holding.unrealized_pnl()),
        holding.unrealized_pnl_pct()
    )
}

#[async_trait]
impl AnalysisNode for Supervisor {
    fn kind(&self) -> NodeKind {
        NodeKind::Supervisor
    }

    async fn run(&self, state: &AnalysisState) -> Result<StatePatch> {
        let symbol = state.symbol();
        let user = self.render_user(state)?;

        if self.structured {
            return self.synthesize_structured(symbol, user).await;
        }

        let text = self
            .llm
            .complete(Prompt::new(SUPERVISOR_SYSTEM, TEMPERATURE).user(user))
            .await?;
        Ok(StatePatch::synthesized(self.legacy.parse(&text))
            .with_message(format!("Supervisor synthesis completed for {symbol}")))
    }

    fn degraded(&self, _state: &AnalysisState) -> StatePatch {
        StatePatch::synthesized(fallback_output())
    }
}
