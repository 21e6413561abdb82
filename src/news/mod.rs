// src/news/mod.rs
//! Local news aggregation: fetch Google News RSS search results for a fixed
//! set of locality queries, scrape items out of the raw XML, merge, sort
//! newest-first and cap the list.

pub mod aggregate;
pub mod cache;
pub mod extract;
pub mod fetch;

use metrics::{describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

pub use crate::news::aggregate::{aggregate, published_ts};
pub use crate::news::cache::{CachePolicy, FeedCache};
pub use crate::news::extract::{extract_articles, items, RawItem};
pub use crate::news::fetch::{collect_articles, fetch_articles, FeedSource, GoogleNewsFetcher};

/// Locality search strings, one outbound feed request each.
pub const NEWS_QUERIES: [&str; 4] = [
    "Jonesboro GA",
    "Fulton County GA",
    "Henry County GA",
    "Fayette County GA",
];

/// Maximum number of articles served per response.
pub const MAX_ARTICLES: usize = 20;

pub const GOOGLE_NEWS_SEARCH_URL: &str = "https://news.google.com/rss/search";

/// One normalized news story. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub description: String,
    pub source: String,
    pub url: String,
    pub published_at: String,
}

/// Body of `GET /api/news`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsResponse {
    pub articles: Vec<Article>,
}

/// Build the search URL for one query against `base`.
pub fn feed_url(base: &str, query: &str) -> String {
    format!(
        "{}?q={}&hl=en-US&gl=US&ceid=US:en",
        base,
        urlencoding::encode(query)
    )
}

pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_feed_fetch_total", "Outbound feed requests issued.");
        describe_counter!(
            "news_feed_errors_total",
            "Feed requests that failed (status or transport) and yielded no items."
        );
        describe_counter!(
            "news_feed_cache_hits_total",
            "Feed bodies served from the freshness cache."
        );
        describe_histogram!("news_feed_fetch_ms", "Feed fetch time in milliseconds.");
        describe_histogram!("news_articles_served", "Articles returned per news request.");
    });
}

/// Fetch every query, merge and rank. Never fails; worst case is empty.
pub async fn latest_articles(source: &dyn FeedSource) -> Vec<Article> {
    ensure_metrics_described();
    let merged = collect_articles(source, &NEWS_QUERIES).await;
    let merged_len = merged.len();
    let top = aggregate(merged, MAX_ARTICLES);
    histogram!("news_articles_served").record(top.len() as f64);
    tracing::info!(
        target: "news",
        source = source.name(),
        merged = merged_len,
        served = top.len(),
        "news aggregated"
    );
    top
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_url_encodes_query_and_pins_locale() {
        let url = feed_url(GOOGLE_NEWS_SEARCH_URL, "Fulton County GA");
        assert_eq!(
            url,
            "https://news.google.com/rss/search?q=Fulton%20County%20GA&hl=en-US&gl=US&ceid=US:en"
        );
    }

    #[test]
    fn article_serializes_with_camel_case_timestamp() {
        let a = Article {
            title: "t".into(),
            description: "d".into(),
            source: "s".into(),
            url: "u".into(),
            published_at: "p".into(),
        };
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["publishedAt"], "p");
        assert!(v.get("published_at").is_none());
    }
}
