//! Prompt templates
//!
//! Static personas live in [`system`]; templated user messages live in
//! [`user`] and are compiled once into a [`PromptLibrary`].

mod system;
mod user;

pub use system::*;

use minijinja::{AutoEscape, Environment};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

pub const TECHNICAL: &str = "technical";
pub const FUNDAMENTAL: &str = "fundamental";
pub const SENTIMENT: &str = "sentiment";
pub const SUPERVISOR: &str = "supervisor";
pub const REPAIR: &str = "repair";
pub const INTENT: &str = "intent";
pub const PORTFOLIO: &str = "portfolio";

/// Placeholder for values the data sources did not supply
pub const NOT_AVAILABLE: &str = "N/A";

/// Compiled prompt templates
pub struct PromptLibrary {
    env: Environment<'static>,
}

impl PromptLibrary {
    /// Compile every template; fails on a syntax error
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);

        env.add_template(TECHNICAL, user::TECHNICAL_USER)?;
        env.add_template(FUNDAMENTAL, user::FUNDAMENTAL_USER)?;
        env.add_template(SENTIMENT, user::SENTIMENT_USER)?;
        env.add_template(SUPERVISOR, user::SUPERVISOR_USER)?;
        env.add_template(REPAIR, user::REPAIR)?;
        env.add_template(INTENT, user::INTENT_USER)?;
        env.add_template(PORTFOLIO, user::PORTFOLIO_SYSTEM)?;

        Ok(Self { env })
    }

    /// Render a named template with a serializable context
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        Ok(self.env.get_template(name)?.render(ctx)?)
    }
}

impl std::fmt::Debug for PromptLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptLibrary").finish_non_exhaustive()
    }
}

/// `1234567.891` -> `"1,234,568"`, small values keep `decimals` places
pub fn format_number(value: f64, decimals: usize) -> String {
    if value.abs() >= 1_000_000.0 {
        return with_thousands(value.round());
    }
    format!("{value:.decimals$}")
}

/// Dollar amount with two decimals and thousands separators
pub fn format_dollars(value: f64) -> String {
    let cents = format!("{:.2}", value.abs());
    let (whole, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}${}.{frac}", group_digits(whole))
}

/// Optional number, `N/A` when absent
pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format_number(v, decimals))
}

/// Any JSON scalar as prompt text, `N/A` for null or missing
pub fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NOT_AVAILABLE.to_string(),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => format_number(i as f64, 0),
            None => n.as_f64().map_or_else(|| n.to_string(), |f| format_number(f, 4)),
        },
        Some(Value::String(s)) if s.is_empty() => NOT_AVAILABLE.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn with_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{}", group_digits(&digits))
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;
    use serde_json::json;

    #[test]
    fn test_library_compiles_and_renders() {
        let prompts = PromptLibrary::new().unwrap();
        let text = prompts
            .render(REPAIR, context! { error => "missing field `thesis`" })
            .unwrap();
        assert_eq!(
            text,
            "The previous output was invalid. Error: missing field `thesis`. Return ONLY the corrected JSON object matching the schema."
        );
    }

    #[test]
    fn test_intent_prompt_lists_symbols() {
        let prompts = PromptLibrary::new().unwrap();
        let text = prompts
            .render(INTENT, context! { query => "thoughts?", symbols => vec!["AAPL", "MSFT"] })
            .unwrap();
        assert_eq!(text, "Query: thoughts?\nUser Portfolio Holdings: [AAPL, MSFT]");
    }

    #[test]
    fn test_supervisor_legacy_block_is_conditional() {
        let prompts = PromptLibrary::new().unwrap();
        let base = context! {
            ticker => "AAPL",
            technical_report => "t",
            fundamental_report => "f",
            sentiment_report => "s",
            query => "q",
            portfolio_summary => "none",
        };
        let structured = prompts
            .render(SUPERVISOR, context! { legacy => false, ..base.clone() })
            .unwrap();
        let legacy = prompts
            .render(SUPERVISOR, context! { legacy => true, ..base })
            .unwrap();
        assert!(!structured.contains("## KEY RISKS"));
        assert!(legacy.contains("## KEY RISKS"));
        assert!(legacy.contains("12-Month Price Target"));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_number(12.3456, 2), "12.35");
        assert_eq!(format_number(2_500_000_000.4, 2), "2,500,000,000");
        assert_eq!(format_dollars(1234.5), "$1,234.50");
        assert_eq!(format_dollars(-20.0), "-$20.00");
        assert_eq!(format_optional(None, 2), "N/A");
        assert_eq!(format_value(Some(&json!(null))), "N/A");
        assert_eq!(format_value(Some(&json!(0.25))), "0.2500");
        assert_eq!(format_value(Some(&json!(42))), "42");
        assert_eq!(format_value(Some(&json!("Technology"))), "Technology");
        assert_eq!(format_value(None), "N/A");
    }
}
