//! Market-data collaborators
//!
//! The graph's ingestion node depends only on [`MarketDataProvider`].
//! [`LiveMarketData`] fans out to Yahoo Finance, Finnhub and NewsAPI,
//! consulting the per-source rate limiter and the TTL cache before every
//! outbound call. A denied or failed source is omitted, never fatal.

mod finnhub;
mod indicators;
mod news;
mod newsapi;
mod yahoo;

pub use finnhub::{FinnhubClient, MAX_COMPANY_NEWS};
pub use indicators::{MIN_BARS, compute_indicators};
pub use news::{NewsArticle, dedup_headlines, headline_fingerprint};
pub use newsapi::NewsApiClient;
pub use yahoo::{PriceBar, YahooClient};

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, instrument, warn};

use crate::cache::{CacheKey, DataCache, DataKind};
use crate::config::SentinelConfig;
use crate::error::{Result, SentinelError};
use crate::rate_limit::{Source, SourceRateLimiter};

/// Days of daily bars requested for indicators
const HISTORY_DAYS: i64 = 365;

/// Days of company news requested
const NEWS_DAYS: i64 = 7;

/// Everything the ingestion node gathers for one ticker
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub technical_indicators: BTreeMap<String, f64>,
    pub stock_info: Map<String, Value>,
    pub fundamentals: Map<String, Value>,
    pub news_articles: Vec<NewsArticle>,
    pub sentiment_scores: Map<String, Value>,
}

impl MarketSnapshot {
    /// True when no source contributed anything
    pub fn is_empty(&self) -> bool {
        self.technical_indicators.is_empty()
            && self.stock_info.is_empty()
            && self.fundamentals.is_empty()
            && self.news_articles.is_empty()
            && self.sentiment_scores.is_empty()
    }
}

/// Source of gathered market data for a ticker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Gather every input the analysts read. Missing sources leave their
    /// part of the snapshot empty.
    async fn snapshot(&self, ticker: &str) -> Result<MarketSnapshot>;
}

/// Live provider backed by Yahoo Finance, Finnhub and NewsAPI
#[derive(Debug, Clone)]
pub struct LiveMarketData {
    yahoo: YahooClient,
    finnhub: Option<FinnhubClient>,
    newsapi: Option<NewsApiClient>,
    cache: DataCache,
    limiter: SourceRateLimiter,
}

impl LiveMarketData {
    pub fn new(config: &SentinelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            yahoo: YahooClient::new(),
            finnhub: config
                .finnhub_api_key
                .as_ref()
                .map(|key| FinnhubClient::new(client.clone(), key)),
            newsapi: config
                .newsapi_api_key
                .as_ref()
                .map(|key| NewsApiClient::new(client, key)),
            cache: DataCache::new(config.cache_ttl),
            limiter: SourceRateLimiter::new(),
        })
    }

    /// Share a limiter across providers
    pub fn with_limiter(mut self, limiter: SourceRateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Cache hit, else budget check and fetch. `None` when denied or failed.
    async fn fetch_cached<T, F, Fut>(&self, key: CacheKey, source: Source, fetch: F) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let kind = key.kind;
        let result = self
            .cache
            .get_or_fetch(key, || async {
                if !self.limiter.try_acquire(source) {
                    return Err(SentinelError::RateLimitExceeded {
                        provider: source.to_string(),
                    });
                }
                Ok(serde_json::to_value(fetch().await?)?)
            })
            .await
            .and_then(|value| Ok(serde_json::from_value(value)?));

        match result {
            Ok(value) => Some(value),
            Err(SentinelError::RateLimitExceeded { .. }) => None,
            Err(e) => {
                warn!(source = %source, kind = %kind, error = %e, "data source omitted");
                None
            }
        }
    }

    async fn indicators(&self, symbol: &str) -> BTreeMap<String, f64> {
        let key = CacheKey::new(DataKind::Indicators, symbol).with_window("1y");
        self.fetch_cached(key, Source::Yahoo, || async {
            let bars = self.yahoo.history(symbol, HISTORY_DAYS).await?;
            compute_indicators(&bars)
        })
        .await
        .unwrap_or_default()
    }

    async fn profile(&self, symbol: &str) -> Map<String, Value> {
        let Some(finnhub) = &self.finnhub else {
            return Map::new();
        };
        let key = CacheKey::new(DataKind::Profile, symbol);
        self.fetch_cached(key, Source::Finnhub, || finnhub.profile(symbol))
            .await
            .unwrap_or_default()
    }

    async fn fundamentals(&self, symbol: &str) -> Map<String, Value> {
        let Some(finnhub) = &self.finnhub else {
            return Map::new();
        };
        let key = CacheKey::new(DataKind::Fundamentals, symbol);
        self.fetch_cached(key, Source::Finnhub, || finnhub.basic_financials(symbol))
            .await
            .unwrap_or_default()
    }

    async fn sentiment(&self, symbol: &str) -> Map<String, Value> {
        let Some(finnhub) = &self.finnhub else {
            return Map::new();
        };
        let key = CacheKey::new(DataKind::Sentiment, symbol);
        self.fetch_cached(key, Source::Finnhub, || finnhub.news_sentiment(symbol))
            .await
            .unwrap_or_default()
    }

    async fn company_news(&self, symbol: &str) -> Vec<NewsArticle> {
        let Some(finnhub) = &self.finnhub else {
            return Vec::new();
        };
        let key = CacheKey::new(DataKind::CompanyNews, symbol).with_window(format!("{NEWS_DAYS}d"));
        self.fetch_cached(key, Source::Finnhub, || finnhub.company_news(symbol, NEWS_DAYS))
            .await
            .unwrap_or_default()
    }

    async fn headline_news(&self, symbol: &str) -> Vec<NewsArticle> {
        let Some(newsapi) = &self.newsapi else {
            return Vec::new();
        };
        let key = CacheKey::new(DataKind::HeadlineNews, symbol);
        self.fetch_cached(key, Source::NewsApi, || newsapi.search(symbol))
            .await
            .unwrap_or_default()
    }
}

#[async_trait]
impl MarketDataProvider for LiveMarketData {
    #[instrument(skip(self))]
    async fn snapshot(&self, ticker: &str) -> Result<MarketSnapshot> {
        let symbol = ticker.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(SentinelError::InvalidSymbol(ticker.to_string()));
        }

        let (technical_indicators, mut stock_info, fundamentals, company_news, headline_news, sentiment_scores) = tokio::join!(
            self.indicators(&symbol),
            self.profile(&symbol),
            self.fundamentals(&symbol),
            self.company_news(&symbol),
            self.headline_news(&symbol),
            self.sentiment(&symbol),
        );

        if let Some(price) = technical_indicators.get("current_price") {
            stock_info.insert("current_price".to_string(), json!(price));
        }
        let news_articles = dedup_headlines(company_news.into_iter().chain(headline_news).collect());

        info!(
            symbol = %symbol,
            indicators = technical_indicators.len(),
            fundamentals = fundamentals.len(),
            articles = news_articles.len(),
            sentiment = !sentiment_scores.is_empty(),
            "market snapshot gathered"
        );

        Ok(MarketSnapshot {
            technical_indicators,
            stock_info,
            fundamentals,
            news_articles,
            sentiment_scores,
        })
    }
}
