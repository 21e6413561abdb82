// src/news/fetch.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use futures::future::join_all;
use metrics::{counter, histogram};
use reqwest::Client;

use crate::news::cache::{CachePolicy, FeedCache};
use crate::news::extract::extract_articles;
use crate::news::{feed_url, Article, GOOGLE_NEWS_SEARCH_URL};

/// Where raw feed text comes from. `Err` means "no items for this query".
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self, query: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Google News RSS search over an explicit HTTP client and cache policy.
pub struct GoogleNewsFetcher {
    client: Client,
    base_url: String,
    policy: CachePolicy,
    cache: FeedCache,
}

impl GoogleNewsFetcher {
    pub fn new(client: Client, policy: CachePolicy) -> Self {
        Self {
            client,
            base_url: GOOGLE_NEWS_SEARCH_URL.to_string(),
            policy,
            cache: FeedCache::new(),
        }
    }

    /// Point at another search endpoint (local mock servers in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn cached_feeds(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl FeedSource for GoogleNewsFetcher {
    async fn fetch_feed(&self, query: &str) -> Result<String> {
        let url = feed_url(&self.base_url, query);
        if let Some(body) = self.cache.get_fresh(&url, self.policy.max_age) {
            counter!("news_feed_cache_hits_total").increment(1);
            return Ok(body);
        }

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("news http get() for {query:?}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("news feed for {query:?} returned {status}"));
        }
        let body = resp.text().await.context("news http .text()")?;

        self.cache.insert(&url, body.clone());
        Ok(body)
    }

    fn name(&self) -> &'static str {
        "google-news"
    }
}

pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Articles for one query. Upstream failures are logged and yield nothing.
pub async fn fetch_articles(source: &dyn FeedSource, query: &str) -> Vec<Article> {
    let t0 = std::time::Instant::now();
    counter!("news_feed_fetch_total").increment(1);

    let out = match source.fetch_feed(query).await {
        Ok(body) => extract_articles(&body, query, &now_iso()),
        Err(e) => {
            tracing::warn!(error = ?e, provider = source.name(), query, "feed fetch failed");
            counter!("news_feed_errors_total").increment(1);
            Vec::new()
        }
    };

    histogram!("news_feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    tracing::debug!(target: "news", query, items = out.len(), "feed scraped");
    out
}

/// Fetch all queries concurrently and concatenate the results.
pub async fn collect_articles(source: &dyn FeedSource, queries: &[&str]) -> Vec<Article> {
    join_all(queries.iter().map(|q| fetch_articles(source, q)))
        .await
        .into_iter()
        .flatten()
        .collect()
}
