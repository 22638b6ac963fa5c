//! Portfolio question answering over the caller's holdings

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::llm::{ModelClient, Prompt};
use crate::portfolio::{Holding, total_equity};
use crate::prompts::{self, PromptLibrary, format_dollars};
use crate::request::{AnalyzeRequest, ConversationTurn};
use crate::response::AnalyzeResponse;

const TEMPERATURE: f32 = 0.2;

/// Prior turns replayed to the model
const HISTORY_TURNS: usize = 4;

#[derive(Serialize)]
struct HoldingRow<'a> {
    symbol: &'a str,
    quantity: String,
    price: String,
    average_cost: String,
    pnl: String,
    pnl_pct: String,
}

impl<'a> From<&'a Holding> for HoldingRow<'a> {
    fn from(h: &'a Holding) -> Self {
        Self {
            symbol: &h.symbol,
            quantity: h.quantity.to_string(),
            price: format_dollars(h.price),
            average_cost: format_dollars(h.average_buy_price),
            pnl: format_dollars(h.unrealized_pnl()),
            pnl_pct: format!("{:.2}%", h.unrealized_pnl_pct()),
        }
    }
}

/// Answers questions about the caller's own positions
pub struct PortfolioAnalyst {
    llm: ModelClient,
    prompts: Arc<PromptLibrary>,
}

impl PortfolioAnalyst {
    pub fn new(llm: ModelClient, prompts: Arc<PromptLibrary>) -> Self {
        Self { llm, prompts }
    }

    #[instrument(skip_all, fields(holdings = request.portfolio_context.len()))]
    pub async fn answer(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        let holdings = &request.portfolio_context;
        let rows: Vec<HoldingRow<'_>> = holdings.iter().map(HoldingRow::from).collect();
        let system = self.prompts.render(
            prompts::PORTFOLIO,
            minijinja::context! {
                holdings => rows,
                total_equity => format_dollars(total_equity(holdings)),
            },
        )?;

        let prompt = Prompt::new(system, TEMPERATURE)
            .messages(
                request
                    .recent_history(HISTORY_TURNS)
                    .iter()
                    .map(ConversationTurn::to_message),
            )
            .user(&request.query);
        let text = self.llm.complete(prompt).await?;

        Ok(AnalyzeResponse::general(text))
    }
}
