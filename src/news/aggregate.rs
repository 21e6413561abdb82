// src/news/aggregate.rs
use std::cmp::Reverse;

use chrono::DateTime;

use crate::news::Article;

/// Unix millis for a feed timestamp. Feeds carry RFC 2822 (`pubDate`); the
/// "now" fallback is RFC 3339. Anything else is `None`.
pub fn published_ts(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .or_else(|e| without_weekday(s).map_or(Err(e), DateTime::parse_from_rfc2822))
        .ok()
        .map(|dt| dt.timestamp_millis())
}

// chrono rejects a weekday that disagrees with the date; the date wins.
fn without_weekday(s: &str) -> Option<&str> {
    let (day, rest) = s.split_once(',')?;
    day.chars()
        .all(|c| c.is_ascii_alphabetic())
        .then(|| rest.trim_start())
}

/// Newest first, then cap at `limit`.
///
/// Unparseable timestamps rank below every dated article. The sort is stable,
/// so ties keep their merge order and nothing is dropped.
pub fn aggregate(mut articles: Vec<Article>, limit: usize) -> Vec<Article> {
    articles.sort_by_cached_key(|a| Reverse(published_ts(&a.published_at)));
    articles.truncate(limit);
    articles
}
