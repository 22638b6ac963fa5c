//! Daily price history from Yahoo Finance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

use crate::error::{Result, SentinelError};

/// One daily OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Yahoo Finance chart client
#[derive(Debug, Clone, Default)]
pub struct YahooClient;

impl YahooClient {
    pub fn new() -> Self {
        Self
    }

    /// Daily bars for the trailing `days`, oldest first
    pub async fn history(&self, symbol: &str, days: i64) -> Result<Vec<PriceBar>> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| SentinelError::YahooFinanceError(e.to_string()))?;

        let end = Utc::now();
        let start = end - chrono::Duration::days(days);
        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| SentinelError::YahooFinanceError(format!("Invalid start timestamp: {e}")))?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| SentinelError::YahooFinanceError(format!("Invalid end timestamp: {e}")))?;

        let response = provider
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(|e| SentinelError::YahooFinanceError(e.to_string()))?;
        let quotes = response
            .quotes()
            .map_err(|e| SentinelError::YahooFinanceError(e.to_string()))?;
        if quotes.is_empty() {
            return Err(SentinelError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no price history returned".to_string(),
            });
        }

        Ok(quotes
            .iter()
            .map(|q| PriceBar {
                timestamp: DateTime::from_timestamp(q.timestamp as i64, 0).unwrap_or_else(Utc::now),
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume as f64,
            })
            .collect())
    }
}
