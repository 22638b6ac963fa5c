//! News article record and headline deduplication

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Characters of the normalized headline compared when deduplicating
const FINGERPRINT_CHARS: usize = 30;

/// One news item, normalized across providers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewsArticle {
    pub headline: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
    /// RFC 3339 timestamp, empty when unknown
    #[serde(default)]
    pub published_at: String,
    /// Which API supplied the article
    #[serde(default)]
    pub provider: String,
}

/// Lowercase alphanumeric prefix used as the duplicate fingerprint
pub fn headline_fingerprint(headline: &str) -> String {
    headline
        .chars()
        .flat_map(char::to_lowercase)
        .filter(char::is_ascii_alphanumeric)
        .take(FINGERPRINT_CHARS)
        .collect()
}

/// Drop empty headlines and later duplicates, keeping first-seen order
pub fn dedup_headlines(articles: Vec<NewsArticle>) -> Vec<NewsArticle> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|article| {
            let fingerprint = headline_fingerprint(&article.headline);
            !fingerprint.is_empty() && seen.insert(fingerprint)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(headline: &str, provider: &str) -> NewsArticle {
        NewsArticle {
            headline: headline.to_string(),
            provider: provider.to_string(),
            ..NewsArticle::default()
        }
    }

    #[test]
    fn test_fingerprint_normalizes() {
        assert_eq!(headline_fingerprint("Apple, Inc. Beats!"), "appleincbeats");
        assert_eq!(headline_fingerprint("  "), "");
        assert_eq!(headline_fingerprint(&"x".repeat(50)).len(), 30);
    }

    #[test]
    fn test_case_and_punctuation_variants_collapse() {
        let articles = vec![
            article("Nvidia Beats Estimates, Shares Jump", "finnhub"),
            article("Fed holds rates steady", "finnhub"),
            article("NVIDIA beats estimates -- shares jump!", "newsapi"),
        ];
        let unique = dedup_headlines(articles);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].provider, "finnhub");
        assert_eq!(unique[0].headline, "Nvidia Beats Estimates, Shares Jump");
        assert_eq!(unique[1].headline, "Fed holds rates steady");
    }

    #[test]
    fn test_only_first_thirty_characters_matter() {
        let unique = dedup_headlines(vec![
            article("Tesla deliveries top expectations in Q3, stock rallies", "a"),
            article("Tesla deliveries top expectations in Q3 while bears retreat", "b"),
        ]);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].provider, "a");
    }

    #[test]
    fn test_empty_headlines_dropped() {
        let unique = dedup_headlines(vec![article("", "a"), article("...", "b"), article("Real news", "c")]);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].provider, "c");
    }
}
