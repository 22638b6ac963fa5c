//! NewsAPI `everything` search

use reqwest::Client;
use serde::Deserialize;

use super::news::NewsArticle;
use crate::error::{Result, SentinelError};

const EVERYTHING_URL: &str = "https://newsapi.org/v2/everything";

/// Articles requested per search
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    #[serde(default)]
    source: RawSource,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSource {
    name: Option<String>,
}

/// NewsAPI client
#[derive(Debug, Clone)]
pub struct NewsApiClient {
    client: Client,
    api_key: String,
}

impl NewsApiClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    /// Most recent English articles mentioning `query`
    pub async fn search(&self, query: &str) -> Result<Vec<NewsArticle>> {
        let page_size = PAGE_SIZE.to_string();
        let response = self
            .client
            .get(EVERYTHING_URL)
            .query(&[
                ("q", query),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SentinelError::ApiError(format!("NewsAPI request failed: {e}")))?;

        let status = response.status();
        let body: EverythingResponse = response
            .json()
            .await
            .map_err(|e| SentinelError::ApiError(format!("Failed to parse NewsAPI response: {e}")))?;
        articles(status.is_success(), body)
    }
}

fn articles(http_ok: bool, body: EverythingResponse) -> Result<Vec<NewsArticle>> {
    if !http_ok || body.status == "error" {
        return Err(SentinelError::ApiError(format!(
            "NewsAPI error: {}",
            body.message.unwrap_or_else(|| "unknown error".to_string())
        )));
    }

    Ok(body
        .articles
        .into_iter()
        .take(PAGE_SIZE)
        .map(|a| NewsArticle {
            headline: a.title.unwrap_or_default(),
            source: a.source.name.unwrap_or_default(),
            summary: a.description.unwrap_or_default(),
            url: a.url.unwrap_or_default(),
            published_at: a.published_at.unwrap_or_default(),
            provider: "newsapi".to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_articles_mapping() {
        let body: EverythingResponse = serde_json::from_value(json!({
            "status": "ok",
            "totalResults": 2,
            "articles": [
                {
                    "source": {"id": null, "name": "Bloomberg"},
                    "title": "Microsoft expands AI push",
                    "description": "Details inside",
                    "url": "https://example.com/a",
                    "publishedAt": "2024-05-01T12:00:00Z"
                },
                {"source": {}, "title": null}
            ]
        }))
        .unwrap();

        let list = articles(true, body).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].source, "Bloomberg");
        assert_eq!(list[0].provider, "newsapi");
        assert_eq!(list[0].published_at, "2024-05-01T12:00:00Z");
        assert_eq!(list[1].headline, "");
    }

    #[test]
    fn test_error_status_is_an_error() {
        let body: EverythingResponse = serde_json::from_value(json!({
            "status": "error",
            "code": "rateLimited",
            "message": "You have made too many requests"
        }))
        .unwrap();
        let err = articles(false, body).unwrap_err();
        assert!(err.to_string().contains("too many requests"));
    }
}
