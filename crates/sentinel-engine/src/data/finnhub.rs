//! Finnhub client: company profile, basic financials, company news and
//! news sentiment

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use super::news::NewsArticle;
use crate::error::{Result, SentinelError};

const BASE_URL: &str = "https://finnhub.io/api/v1";

/// Most company-news articles kept per request
pub const MAX_COMPANY_NEWS: usize = 15;

/// Basic-financials fields surfaced to the fundamental analyst, in order
const METRIC_FIELDS: &[(&str, &str)] = &[
    ("peTTM", "pe_ratio"),
    ("pbQuarterly", "price_to_book"),
    ("psTTM", "price_to_sales"),
    ("epsTTM", "eps"),
    ("grossMarginTTM", "gross_margins"),
    ("operatingMarginTTM", "operating_margins"),
    ("netProfitMarginTTM", "profit_margins"),
    ("roeTTM", "return_on_equity"),
    ("roaTTM", "return_on_assets"),
    ("revenueGrowthTTMYoy", "revenue_growth"),
    ("epsGrowthTTMYoy", "earnings_growth"),
    ("totalDebt/totalEquityQuarterly", "debt_to_equity"),
    ("currentRatioQuarterly", "current_ratio"),
    ("dividendYieldIndicatedAnnual", "dividend_yield"),
    ("beta", "beta"),
    ("52WeekHigh", "week_52_high"),
    ("52WeekLow", "week_52_low"),
];

#[derive(Debug, Deserialize)]
struct CompanyNewsItem {
    #[serde(default)]
    datetime: i64,
    #[serde(default)]
    headline: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Buzz {
    articles_in_last_week: Option<f64>,
    buzz: Option<f64>,
    weekly_average: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SentimentSplit {
    bullish_percent: Option<f64>,
    bearish_percent: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsSentiment {
    #[serde(default)]
    buzz: Buzz,
    #[serde(default)]
    sentiment: SentimentSplit,
    company_news_score: Option<f64>,
    sector_average_bullish_percent: Option<f64>,
    sector_average_news_score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    name: Option<String>,
    ticker: Option<String>,
    exchange: Option<String>,
    finnhub_industry: Option<String>,
    country: Option<String>,
    currency: Option<String>,
    /// Millions of the listing currency
    market_capitalization: Option<f64>,
    weburl: Option<String>,
}

/// Finnhub REST client
#[derive(Debug, Clone)]
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FinnhubClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| SentinelError::ApiError(format!("Finnhub request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SentinelError::ApiError(format!("Finnhub API error {status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SentinelError::ApiError(format!("Failed to parse Finnhub response: {e}")))
    }

    /// Company news for the trailing `days`, newest first as returned
    pub async fn company_news(&self, symbol: &str, days: i64) -> Result<Vec<NewsArticle>> {
        let today = Utc::now().date_naive();
        let from = (today - Duration::days(days)).to_string();
        let to = today.to_string();
        let items: Vec<CompanyNewsItem> = self
            .get(
                "company-news",
                &[("symbol", symbol), ("from", from.as_str()), ("to", to.as_str())],
            )
            .await?;
        Ok(company_news_articles(items))
    }

    /// Aggregate news sentiment and buzz
    pub async fn news_sentiment(&self, symbol: &str) -> Result<Map<String, Value>> {
        let raw: NewsSentiment = self.get("news-sentiment", &[("symbol", symbol)]).await?;
        Ok(sentiment_scores(raw))
    }

    /// Company profile as stock info
    pub async fn profile(&self, symbol: &str) -> Result<Map<String, Value>> {
        let raw: Profile = self.get("stock/profile2", &[("symbol", symbol)]).await?;
        Ok(stock_info(raw))
    }

    /// Basic financial metrics as the fundamentals bundle
    pub async fn basic_financials(&self, symbol: &str) -> Result<Map<String, Value>> {
        let raw: Value = self
            .get("stock/metric", &[("symbol", symbol), ("metric", "all")])
            .await?;
        Ok(fundamentals(&raw))
    }
}

fn company_news_articles(items: Vec<CompanyNewsItem>) -> Vec<NewsArticle> {
    items
        .into_iter()
        .take(MAX_COMPANY_NEWS)
        .map(|item| NewsArticle {
            headline: item.headline,
            source: item.source,
            summary: item.summary,
            url: item.url,
            published_at: DateTime::from_timestamp(item.datetime, 0)
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
            provider: "finnhub".to_string(),
        })
        .collect()
}

fn sentiment_scores(raw: NewsSentiment) -> Map<String, Value> {
    let fields = [
        ("bullish_percent", raw.sentiment.bullish_percent),
        ("bearish_percent", raw.sentiment.bearish_percent),
        ("articles_in_last_week", raw.buzz.articles_in_last_week),
        ("buzz", raw.buzz.buzz),
        ("weekly_average", raw.buzz.weekly_average),
        ("company_news_score", raw.company_news_score),
        ("sector_average_bullish", raw.sector_average_bullish_percent),
        ("sector_average_news_score", raw.sector_average_news_score),
    ];
    fields
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), json!(v))))
        .collect()
}

fn stock_info(raw: Profile) -> Map<String, Value> {
    let mut info = Map::new();
    let text = [
        ("name", raw.name),
        ("ticker", raw.ticker),
        ("exchange", raw.exchange),
        ("sector", raw.finnhub_industry),
        ("country", raw.country),
        ("currency", raw.currency),
        ("website", raw.weburl),
    ];
    for (key, value) in text {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            info.insert(key.to_string(), Value::String(v));
        }
    }
    if let Some(cap) = raw.market_capitalization {
        info.insert("market_cap".to_string(), json!(cap * 1_000_000.0));
    }
    info
}

fn fundamentals(raw: &Value) -> Map<String, Value> {
    let Some(metric) = raw.get("metric").and_then(Value::as_object) else {
        return Map::new();
    };
    METRIC_FIELDS
        .iter()
        .filter_map(|(source, name)| {
            metric
                .get(*source)
                .filter(|v| v.is_number())
                .map(|v| ((*name).to_string(), v.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_news_mapping_caps_results() {
        let items: Vec<CompanyNewsItem> = serde_json::from_value(json!(
            (0..20)
                .map(|i| json!({
                    "category": "company",
                    "datetime": 1_700_000_000 + i,
                    "headline": format!("Headline {i}"),
                    "source": "Reuters",
                    "summary": "",
                    "url": "https://example.com"
                }))
                .collect::<Vec<_>>()
        ))
        .unwrap();

        let articles = company_news_articles(items);
        assert_eq!(articles.len(), MAX_COMPANY_NEWS);
        assert_eq!(articles[0].headline, "Headline 0");
        assert_eq!(articles[0].provider, "finnhub");
        assert!(articles[0].published_at.starts_with("2023-11-14T"));
    }

    #[test]
    fn test_sentiment_scores_flatten() {
        let raw: NewsSentiment = serde_json::from_value(json!({
            "buzz": {"articlesInLastWeek": 20, "buzz": 0.9, "weeklyAverage": 22.25},
            "companyNewsScore": 0.62,
            "sectorAverageBullishPercent": 0.58,
            "sectorAverageNewsScore": 0.51,
            "sentiment": {"bearishPercent": 0.2, "bullishPercent": 0.8},
            "symbol": "V"
        }))
        .unwrap();

        let scores = sentiment_scores(raw);
        assert_eq!(scores["bullish_percent"], json!(0.8));
        assert_eq!(scores["articles_in_last_week"], json!(20.0));
        assert_eq!(scores["sector_average_bullish"], json!(0.58));
        assert_eq!(scores.len(), 8);
    }

    #[test]
    fn test_empty_sentiment_yields_empty_map() {
        let raw: NewsSentiment = serde_json::from_value(json!({})).unwrap();
        assert!(sentiment_scores(raw).is_empty());
    }

    #[test]
    fn test_profile_to_stock_info() {
        let raw: Profile = serde_json::from_value(json!({
            "name": "Apple Inc",
            "ticker": "AAPL",
            "finnhubIndustry": "Technology",
            "marketCapitalization": 2_500_000.0,
            "weburl": ""
        }))
        .unwrap();

        let info = stock_info(raw);
        assert_eq!(info["name"], "Apple Inc");
        assert_eq!(info["sector"], "Technology");
        assert_eq!(info["market_cap"], json!(2_500_000_000_000.0));
        assert!(!info.contains_key("website"));
    }

    #[test]
    fn test_fundamentals_picks_known_metrics() {
        let raw = json!({
            "metric": {
                "peTTM": 28.4,
                "roeTTM": 150.1,
                "52WeekHigh": 199.6,
                "someOtherField": 1,
                "beta": null
            },
            "series": {}
        });
        let bundle = fundamentals(&raw);
        assert_eq!(bundle.len(), 3);
        assert_eq!(bundle["pe_ratio"], json!(28.4));
        assert_eq!(bundle["week_52_high"], json!(199.6));
        assert!(fundamentals(&json!({})).is_empty());
    }
}
