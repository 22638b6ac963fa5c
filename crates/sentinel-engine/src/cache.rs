//! TTL cache for upstream data to reduce API calls

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cached::{Cached, TimedCache};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

/// Category of cached upstream data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Indicators,
    Profile,
    Fundamentals,
    CompanyNews,
    HeadlineNews,
    Sentiment,
}

impl DataKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Indicators => "indicators",
            Self::Profile => "profile",
            Self::Fundamentals => "fundamentals",
            Self::CompanyNews => "company_news",
            Self::HeadlineNews => "headline_news",
            Self::Sentiment => "sentiment",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key: data kind, ticker and an optional window such as `1y`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub kind: DataKind,
    pub ticker: String,
    pub window: Option<String>,
}

impl CacheKey {
    pub fn new(kind: DataKind, ticker: impl Into<String>) -> Self {
        Self {
            kind,
            ticker: ticker.into().to_uppercase(),
            window: None,
        }
    }

    pub fn with_window(mut self, window: impl Into<String>) -> Self {
        self.window = Some(window.into());
        self
    }
}

/// Thread-safe TTL cache. Last writer wins.
#[derive(Clone)]
pub struct DataCache {
    cache: Arc<RwLock<TimedCache<CacheKey, Value>>>,
}

impl DataCache {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a live value; expired entries are evicted on read
    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    pub async fn insert(&self, key: CacheKey, value: Value) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Return the cached value or run `fetcher` and cache its result.
    /// Errors are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: CacheKey, fetcher: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(kind = %key.kind, ticker = %key.ticker, "cache hit");
            return Ok(value);
        }

        tracing::debug!(kind = %key.kind, ticker = %key.ticker, "cache miss");
        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_remove(key);
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    /// Number of entries, including ones not yet evicted
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl fmt::Debug for DataCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_normalizes_ticker() {
        let key = CacheKey::new(DataKind::Indicators, "aapl").with_window("1y");
        assert_eq!(key.ticker, "AAPL");
        assert_eq!(key.window.as_deref(), Some("1y"));
        assert_ne!(key, CacheKey::new(DataKind::Indicators, "AAPL"));
    }

    #[tokio::test]
    async fn test_insert_get_and_overwrite() {
        let cache = DataCache::new(Duration::from_secs(60));
        let key = CacheKey::new(DataKind::Profile, "MSFT");

        cache.insert(key.clone(), json!({"name": "Microsoft"})).await;
        cache.insert(key.clone(), json!({"name": "Microsoft Corp"})).await;

        assert_eq!(cache.get(&key).await, Some(json!({"name": "Microsoft Corp"})));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_calls_fetcher_once() {
        let cache = DataCache::new(Duration::from_secs(60));
        let key = CacheKey::new(DataKind::Sentiment, "TSLA");
        let value = json!({"bullish_percent": 0.7});

        let mut calls = 0;
        let result = cache
            .get_or_fetch(key.clone(), || {
                calls += 1;
                async { Ok::<_, String>(value.clone()) }
            })
            .await
            .unwrap();
        assert_eq!(result, value);

        let result = cache
            .get_or_fetch(key.clone(), || {
                calls += 1;
                async { Ok::<_, String>(json!(null)) }
            })
            .await
            .unwrap();
        assert_eq!(result, value);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_fetch_errors_are_not_cached() {
        let cache = DataCache::new(Duration::from_secs(60));
        let key = CacheKey::new(DataKind::CompanyNews, "AMD");

        let result = cache
            .get_or_fetch(key.clone(), || async { Err::<Value, _>("upstream down") })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = DataCache::new(Duration::from_secs(60));
        for ticker in ["A", "B", "C"] {
            cache.insert(CacheKey::new(DataKind::Fundamentals, ticker), json!({})).await;
        }

        cache.invalidate(&CacheKey::new(DataKind::Fundamentals, "A")).await;
        assert_eq!(cache.len().await, 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = DataCache::new(Duration::from_millis(20));
        let key = CacheKey::new(DataKind::Indicators, "NVDA");
        cache.insert(key.clone(), json!({"rsi": 55.0})).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get(&key).await, None);
    }
}
