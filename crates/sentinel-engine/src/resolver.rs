//! Intent and entity resolution
//!
//! Deterministic matchers run in a fixed priority order and the first hit
//! wins. The model classifier is consulted only when every matcher misses.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::decision::strip_code_fence;
use crate::error::Result;
use crate::llm::{ModelClient, Prompt};
use crate::portfolio::Holding;
use crate::prompts::{self, PromptLibrary};
use crate::state::Intent;

/// Substrings that mark a question about the user's own position
const HOLDINGS_KEYWORDS: &[&str] = &[
    "POSITION",
    "HOLDING",
    "SHARES",
    "AVG COST",
    "AVERAGE COST",
    "OWN",
    "PRICE OF",
    "MY PL",
    "MY P&L",
];

/// Verb + ticker templates, case-insensitive
const COMMAND_PATTERNS: &[&str] = &[
    r"(?i)(?:analyze|check|review|news|sentiment|technical|fundamental)\s+(?:for\s+)?([A-Z]{1,5})\b",
    r"(?i)(?:what|how|tell)\s+(?:is|about|me)\s+(?:about\s+)?(?:going on with\s+)?([A-Z]{1,5})\b",
    r"(?i)\b([A-Z]{1,5})\s+(?:ticker|stock|analysis|news|sentiment)",
    r"(?i)(?:look at|examine|evaluate)\s+([A-Z]{1,5})\b",
];

/// Words the command templates capture that are never tickers
const STOP_WORDS: &[&str] = &[
    "THE", "FOR", "AND", "THIS", "THAT", "WITH", "FROM", "WHAT", "HOW", "NEWS", "ABOUT", "ME", "MY",
    "IS", "IT", "A", "AN", "ON", "TO", "IN", "OF", "UP", "OUT", "ALL", "AT", "OUR", "YOUR",
];

/// Company names matched as whole phrases, first entry wins
const TICKER_MAP: &[(&str, &str)] = &[
    ("berkshire hathaway", "BRK.B"),
    ("bank of america", "BAC"),
    ("goldman sachs", "GS"),
    ("morgan stanley", "MS"),
    ("jp morgan", "JPM"),
    ("jpmorgan", "JPM"),
    ("johnson & johnson", "JNJ"),
    ("johnson and johnson", "JNJ"),
    ("procter and gamble", "PG"),
    ("coca cola", "KO"),
    ("cocacola", "KO"),
    ("home depot", "HD"),
    ("eli lilly", "LLY"),
    ("exxon mobil", "XOM"),
    ("exxon", "XOM"),
    ("chevron", "CVX"),
    ("apple", "AAPL"),
    ("microsoft", "MSFT"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("amazon", "AMZN"),
    ("nvidia", "NVDA"),
    ("tesla", "TSLA"),
    ("facebook", "META"),
    ("meta", "META"),
    ("netflix", "NFLX"),
    ("intel", "INTC"),
    ("amd", "AMD"),
    ("broadcom", "AVGO"),
    ("oracle", "ORCL"),
    ("salesforce", "CRM"),
    ("adobe", "ADBE"),
    ("palantir", "PLTR"),
    ("paypal", "PYPL"),
    ("visa", "V"),
    ("mastercard", "MA"),
    ("walmart", "WMT"),
    ("costco", "COST"),
    ("disney", "DIS"),
    ("nike", "NKE"),
    ("starbucks", "SBUX"),
    ("boeing", "BA"),
    ("pfizer", "PFE"),
    ("coinbase", "COIN"),
    ("uber", "UBER"),
    ("airbnb", "ABNB"),
    ("shopify", "SHOP"),
    ("spotify", "SPOT"),
];

/// Which cascade step produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    FastHoldingsMatch,
    RegexSymbol,
    RegexCommand,
    PortfolioMatch,
    StaticMap,
    Llm,
    LlmFailed,
    Fallback,
}

impl ResolutionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FastHoldingsMatch => "fast_holdings_match",
            Self::RegexSymbol => "regex_symbol",
            Self::RegexCommand => "regex_command",
            Self::PortfolioMatch => "portfolio_match",
            Self::StaticMap => "static_map",
            Self::Llm => "llm",
            Self::LlmFailed => "llm_failed",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolver output: routing intent, ticker in scope and how it was found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub intent: Intent,
    pub ticker: Option<String>,
    pub confidence: f64,
    pub method: ResolutionMethod,
}

impl Resolution {
    pub fn new(intent: Intent, ticker: Option<String>, confidence: f64, method: ResolutionMethod) -> Self {
        Self {
            intent,
            ticker,
            confidence,
            method,
        }
    }

    /// Generic chat with zero confidence
    pub fn generic(method: ResolutionMethod) -> Self {
        Self::new(Intent::GenericChat, None, 0.0, method)
    }
}

/// Deterministic steps in priority order
const CASCADE: [(ResolutionMethod, Intent, f64); 5] = [
    (ResolutionMethod::FastHoldingsMatch, Intent::HoldingsLookup, 1.0),
    (ResolutionMethod::RegexSymbol, Intent::TickerAnalysis, 1.0),
    (ResolutionMethod::RegexCommand, Intent::TickerAnalysis, 0.9),
    (ResolutionMethod::PortfolioMatch, Intent::TickerAnalysis, 0.85),
    (ResolutionMethod::StaticMap, Intent::TickerAnalysis, 0.8),
];

/// Compiled deterministic matchers
#[derive(Debug, Clone)]
pub struct Matchers {
    symbol: Regex,
    commands: Vec<Regex>,
    names: Vec<(Regex, &'static str)>,
    punctuation: Regex,
}

impl Matchers {
    pub fn new() -> Result<Self> {
        let commands = COMMAND_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let names = TICKER_MAP
            .iter()
            .map(|(name, ticker)| {
                Regex::new(&format!(r"\b{}\b", regex::escape(name))).map(|re| (re, *ticker))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            symbol: Regex::new(r"\$([A-Z]{1,5})\b")?,
            commands,
            names,
            punctuation: Regex::new(r"[^\w\s&]")?,
        })
    }

    /// Run the cascade; `None` when no deterministic step matches
    pub fn resolve(&self, query: &str, holdings: &[Holding]) -> Option<Resolution> {
        CASCADE.iter().find_map(|&(method, intent, confidence)| {
            self.run_step(method, query, holdings)
                .map(|ticker| Resolution::new(intent, Some(ticker), confidence, method))
        })
    }

    fn run_step(&self, method: ResolutionMethod, query: &str, holdings: &[Holding]) -> Option<String> {
        match method {
            ResolutionMethod::FastHoldingsMatch => self.holdings_lookup(query, holdings),
            ResolutionMethod::RegexSymbol => self.ticker_symbol(query),
            ResolutionMethod::RegexCommand => self.command_pattern(query),
            ResolutionMethod::PortfolioMatch => self.portfolio(query, holdings),
            ResolutionMethod::StaticMap => self.static_map(query),
            ResolutionMethod::Llm | ResolutionMethod::LlmFailed | ResolutionMethod::Fallback => None,
        }
    }

    /// A holdings keyword plus a portfolio symbol anywhere in the query
    pub fn holdings_lookup(&self, query: &str, holdings: &[Holding]) -> Option<String> {
        let upper = query.to_uppercase();
        if !HOLDINGS_KEYWORDS.iter().any(|k| upper.contains(k)) {
            return None;
        }
        portfolio_symbol_in(&upper, holdings)
    }

    /// `$TICK` with 1 to 5 letters
    pub fn ticker_symbol(&self, query: &str) -> Option<String> {
        let upper = query.to_uppercase();
        self.symbol
            .captures(&upper)
            .map(|caps| caps[1].to_string())
    }

    /// First command-template capture that is not a stop word
    pub fn command_pattern(&self, query: &str) -> Option<String> {
        self.commands.iter().find_map(|re| {
            re.captures_iter(query)
                .map(|caps| caps[1].to_uppercase())
                .find(|candidate| !STOP_WORDS.contains(&candidate.as_str()))
        })
    }

    /// Any portfolio symbol as a substring of the query
    pub fn portfolio(&self, query: &str, holdings: &[Holding]) -> Option<String> {
        portfolio_symbol_in(&query.to_uppercase(), holdings)
    }

    /// Known company name as a whole word or phrase
    pub fn static_map(&self, query: &str) -> Option<String> {
        let normalized = self.punctuation.replace_all(&query.to_lowercase(), "").into_owned();
        self.names
            .iter()
            .find(|(re, _)| re.is_match(&normalized))
            .map(|(_, ticker)| (*ticker).to_string())
    }
}

fn portfolio_symbol_in(query_upper: &str, holdings: &[Holding]) -> Option<String> {
    holdings
        .iter()
        .map(|h| h.symbol.trim().to_uppercase())
        .find(|symbol| !symbol.is_empty() && query_upper.contains(symbol.as_str()))
}

/// Shape the classifier is asked to return
#[derive(Debug, Deserialize)]
struct Classification {
    intent: Intent,
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

/// Full resolver: deterministic cascade, then the optional model fallback
#[derive(Debug, Clone)]
pub struct EntityResolver {
    matchers: Matchers,
    llm: Option<ModelClient>,
    prompts: Arc<PromptLibrary>,
}

impl EntityResolver {
    /// `llm` is `None` when model-based resolution is disabled
    pub fn new(llm: Option<ModelClient>, prompts: Arc<PromptLibrary>) -> Result<Self> {
        Ok(Self {
            matchers: Matchers::new()?,
            llm,
            prompts,
        })
    }

    pub fn matchers(&self) -> &Matchers {
        &self.matchers
    }

    /// Resolve a query. Never fails; model errors degrade to generic chat.
    #[instrument(skip(self, holdings), fields(holdings = holdings.len()))]
    pub async fn resolve(&self, query: &str, holdings: &[Holding]) -> Resolution {
        let resolution = match self.matchers.resolve(query, holdings) {
            Some(resolution) => resolution,
            None => match &self.llm {
                Some(llm) => self.classify(llm, query, holdings).await,
                None => Resolution::generic(ResolutionMethod::Fallback),
            },
        };

        info!(
            intent = %resolution.intent,
            ticker = resolution.ticker.as_deref().unwrap_or("-"),
            confidence = resolution.confidence,
            method = %resolution.method,
            "query resolved"
        );
        resolution
    }

    async fn classify(&self, llm: &ModelClient, query: &str, holdings: &[Holding]) -> Resolution {
        match self.try_classify(llm, query, holdings).await {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(error = %e, "model-based resolution failed");
                Resolution::generic(ResolutionMethod::LlmFailed)
            }
        }
    }

    async fn try_classify(&self, llm: &ModelClient, query: &str, holdings: &[Holding]) -> Result<Resolution> {
        let symbols: Vec<&str> = holdings.iter().map(|h| h.symbol.as_str()).collect();
        let user = self.prompts.render(
            prompts::INTENT,
            minijinja::context! { query => query, symbols => symbols },
        )?;

        let raw = llm
            .complete(Prompt::new(prompts::INTENT_SYSTEM, 0.0).user(user).json())
            .await?;
        debug!(raw = %raw, "classifier output");

        let parsed: Classification = serde_json::from_str(strip_code_fence(&raw))?;
        let ticker = parsed
            .ticker
            .map(|t| t.trim().trim_start_matches('$').to_uppercase())
            .filter(|t| !t.is_empty() && t != "NULL");

        Ok(Resolution::new(
            parsed.intent,
            ticker,
            parsed.confidence.clamp(0.0, 1.0),
            ResolutionMethod::Llm,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SentinelConfig;
    use crate::test_support::ScriptedProvider;

    fn matchers() -> Matchers {
        Matchers::new().unwrap()
    }

    fn portfolio(symbols: &[&str]) -> Vec<Holding> {
        symbols
            .iter()
            .map(|s| Holding::new(*s, 10.0, 100.0, 90.0))
            .collect()
    }

    fn resolver(provider: Option<Arc<ScriptedProvider>>) -> EntityResolver {
        let config = SentinelConfig::default();
        let llm = provider.map(|p| ModelClient::new(p, &config));
        EntityResolver::new(llm, Arc::new(PromptLibrary::new().unwrap())).unwrap()
    }

    #[test]
    fn test_dollar_symbol_wins_regardless_of_portfolio() {
        let m = matchers();
        for holdings in [vec![], portfolio(&["MSFT", "TSLA"])] {
            for (query, ticker) in [
                ("thoughts on $AAPL?", "AAPL"),
                ("$f looks cheap", "F"),
                ("compare $GOOGL and $MSFT", "GOOGL"),
            ] {
                let r = m.resolve(query, &holdings).unwrap();
                assert_eq!(r.intent, Intent::TickerAnalysis);
                assert_eq!(r.ticker.as_deref(), Some(ticker));
                assert!((r.confidence - 1.0).abs() < f64::EPSILON);
                assert_eq!(r.method, ResolutionMethod::RegexSymbol);
            }
        }
    }

    #[test]
    fn test_portfolio_substring_match() {
        let r = matchers()
            .resolve("should I sell NVDA?", &portfolio(&["NVDA"]))
            .unwrap();
        assert_eq!(r.ticker.as_deref(), Some("NVDA"));
        assert_eq!(r.method, ResolutionMethod::PortfolioMatch);
        assert!((r.confidence - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_holdings_lookup_beats_every_other_step() {
        let m = matchers();
        let holdings = portfolio(&["AAPL"]);
        // command pattern and static map would both match here
        for query in ["what is my position in AAPL stock", "analyze AAPL shares, apple"] {
            let r = m.resolve(query, &holdings).unwrap();
            assert_eq!(r.intent, Intent::HoldingsLookup);
            assert_eq!(r.ticker.as_deref(), Some("AAPL"));
            assert!((r.confidence - 1.0).abs() < f64::EPSILON);
            assert_eq!(r.method, ResolutionMethod::FastHoldingsMatch);
        }
    }

    #[test]
    fn test_holdings_keyword_without_portfolio_symbol_falls_through() {
        let r = matchers().resolve("how many shares of TSLA", &portfolio(&["AAPL"]));
        assert!(r.is_none());
    }

    #[test]
    fn test_command_patterns() {
        let m = matchers();
        assert_eq!(m.command_pattern("analyze TSLA"), Some("TSLA".to_string()));
        assert_eq!(m.command_pattern("check for amd please"), Some("AMD".to_string()));
        assert_eq!(m.command_pattern("tell me about PLTR"), Some("PLTR".to_string()));
        assert_eq!(m.command_pattern("what is going on with SNOW"), Some("SNOW".to_string()));
        assert_eq!(m.command_pattern("COIN stock outlook"), Some("COIN".to_string()));
        assert_eq!(m.command_pattern("look at F"), Some("F".to_string()));
        assert_eq!(m.command_pattern("how is the market"), None);
        assert_eq!(m.command_pattern("hello there"), None);

        let r = m.resolve("analyze TSLA", &[]).unwrap();
        assert_eq!(r.method, ResolutionMethod::RegexCommand);
        assert!((r.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_static_map_whole_phrase() {
        let m = matchers();
        assert_eq!(m.static_map("Thoughts on Microsoft?"), Some("MSFT".to_string()));
        assert_eq!(m.static_map("is bank of america a buy"), Some("BAC".to_string()));
        assert_eq!(m.static_map("pineapple prices"), None);

        let r = m.resolve("do you like nvidia right now", &[]).unwrap();
        assert_eq!(r.ticker.as_deref(), Some("NVDA"));
        assert_eq!(r.method, ResolutionMethod::StaticMap);
        assert!((r.confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_deterministic_match() {
        assert!(matchers().resolve("explain dollar cost averaging", &[]).is_none());
    }

    #[tokio::test]
    async fn test_disabled_fallback_degrades_to_generic_chat() {
        let r = resolver(None).resolve("explain dollar cost averaging", &[]).await;
        assert_eq!(r, Resolution::generic(ResolutionMethod::Fallback));
    }

    #[tokio::test]
    async fn test_llm_fallback_parses_fenced_json() {
        let provider = Arc::new(ScriptedProvider::new([
            "```json\n{\"intent\": \"TICKER_ANALYSIS\", \"ticker\": \"crwd\", \"confidence\": 1.4}\n```",
        ]));
        let r = resolver(Some(provider.clone()))
            .resolve("what about the cybersecurity leader", &[])
            .await;

        assert_eq!(r.intent, Intent::TickerAnalysis);
        assert_eq!(r.ticker.as_deref(), Some("CRWD"));
        assert!((r.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(r.method, ResolutionMethod::Llm);

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].json_mode);
        assert_eq!(requests[0].temperature, Some(0.0));
    }

    #[tokio::test]
    async fn test_llm_fallback_failure_degrades() {
        let provider = Arc::new(ScriptedProvider::new(["I think it's about stocks"]));
        let r = resolver(Some(provider)).resolve("hmm", &[]).await;
        assert_eq!(r, Resolution::generic(ResolutionMethod::LlmFailed));

        let provider = Arc::new(ScriptedProvider::failing());
        let r = resolver(Some(provider)).resolve("hmm", &[]).await;
        assert_eq!(r.method, ResolutionMethod::LlmFailed);
    }

    #[tokio::test]
    async fn test_model_not_called_when_cascade_matches() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let r = resolver(Some(provider.clone())).resolve("analyze $AMD", &[]).await;
        assert_eq!(r.method, ResolutionMethod::RegexSymbol);
        assert!(provider.requests().is_empty());
    }

    #[test]
    fn test_method_wire_format() {
        let json = serde_json::to_value(Resolution::generic(ResolutionMethod::LlmFailed)).unwrap();
        assert_eq!(json["method"], "llm_failed");
        assert_eq!(json["intent"], "GENERIC_CHAT");
        assert!(json["ticker"].is_null());
    }
}
