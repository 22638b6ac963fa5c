//! Sentiment analyst node

use std::sync::Arc;

use async_trait::async_trait;
use minijinja::context;

use crate::data::NewsArticle;
use crate::error::Result;
use crate::graph::{AnalysisNode, NodeKind};
use crate::llm::{ModelClient, Prompt};
use crate::prompts::{self, PromptLibrary, SENTIMENT_SYSTEM, format_value};
use crate::state::{AnalysisState, StatePatch};

const TEMPERATURE: f32 = 0.2;

/// Headlines listed in the prompt
const MAX_HEADLINES: usize = 15;

pub const NO_DATA_REPORT: &str = "No sentiment data or news available.";

const NO_HEADLINES: &str = "No recent headlines available.";

/// Reads sentiment scores and headlines, writes `sentiment_report`
pub struct SentimentAnalyst {
    llm: ModelClient,
    prompts: Arc<PromptLibrary>,
}

impl SentimentAnalyst {
    pub fn new(llm: ModelClient, prompts: Arc<PromptLibrary>) -> Self {
        Self { llm, prompts }
    }
}

/// Numbered `[source] headline` lines
fn headline_block(articles: &[NewsArticle]) -> String {
    if articles.is_empty() {
        return NO_HEADLINES.to_string();
    }
    articles
        .iter()
        .take(MAX_HEADLINES)
        .enumerate()
        .map(|(i, article)| {
            let source = if article.source.is_empty() {
                "Unknown"
            } else {
                &article.source
            };
            format!("{}. [{source}] {}", i + 1, article.headline)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl AnalysisNode for SentimentAnalyst {
    fn kind(&self) -> NodeKind {
        NodeKind::SentimentAnalysis
    }

    async fn run(&self, state: &AnalysisState) -> Result<StatePatch> {
        let symbol = state.symbol();
        let scores = &state.sentiment_scores;
        if scores.is_empty() && state.news_articles.is_empty() {
            return Ok(StatePatch::sentiment(NO_DATA_REPORT)
                .with_message(format!("Sentiment analysis skipped for {symbol}: no data")));
        }

        let score = |key: &str| format_value(scores.get(key));
        let user = self.prompts.render(
            prompts::SENTIMENT,
            context! {
                ticker => symbol,
                bullish_percent => score("bullish_percent"),
                bearish_percent => score("bearish_percent"),
                company_news_score => score("company_news_score"),
                sector_average_bullish => score("sector_average_bullish"),
                sector_average_news_score => score("sector_average_news_score"),
                articles_in_last_week => score("articles_in_last_week"),
                weekly_average => score("weekly_average"),
                headlines => headline_block(&state.news_articles),
            },
        )?;

        let report = self
            .llm
            .complete(Prompt::new(SENTIMENT_SYSTEM, TEMPERATURE).user(user))
            .await?;

        Ok(StatePatch::sentiment(report).with_message(format!("Sentiment analysis completed for {symbol}")))
    }

    fn degraded(&self, _state: &AnalysisState) -> StatePatch {
        StatePatch::sentiment(NO_DATA_REPORT)
    }
}
