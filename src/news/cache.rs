// src/news/cache.rs
//! Freshness policy shared by the feed fetcher and the `/api/news` response,
//! plus a small per-URL body cache honouring it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long feed content may be reused, and how downstream caches are told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_age: Duration,
    /// `public` lets shared caches (CDN, proxies) store the response.
    pub public: bool,
}

impl CachePolicy {
    pub const fn hourly() -> Self {
        Self {
            max_age: Duration::from_secs(3600),
            public: true,
        }
    }

    /// Disables the fetcher-side cache; downstream caches are told not to store.
    pub const fn no_store() -> Self {
        Self {
            max_age: Duration::ZERO,
            public: false,
        }
    }

    pub fn header_value(&self) -> String {
        if self.max_age.is_zero() {
            return "no-store".to_string();
        }
        let secs = self.max_age.as_secs();
        if self.public {
            format!("public, s-maxage={secs}")
        } else {
            format!("private, max-age={secs}")
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::hourly()
    }
}

#[derive(Debug)]
struct Entry {
    stored_at: Instant,
    body: String,
}

/// Successful feed bodies keyed by request URL.
#[derive(Debug, Default)]
pub struct FeedCache {
    inner: Mutex<HashMap<String, Entry>>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body stored for `url` if younger than `max_age`. Stale entries are evicted.
    pub fn get_fresh(&self, url: &str, max_age: Duration) -> Option<String> {
        if max_age.is_zero() {
            return None;
        }
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        match map.get(url) {
            Some(e) if e.stored_at.elapsed() < max_age => Some(e.body.clone()),
            Some(_) => {
                map.remove(url);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, url: &str, body: String) {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(
            url.to_string(),
            Entry {
                stored_at: Instant::now(),
                body,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
