// src/news/extract.rs
//! Tolerant item scraper for RSS text. Patterns run over the raw body; no
//! XML parser is involved, so broken markup, odd attributes and missing
//! tags only ever blank out the affected field.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::news::Article;

static RE_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<item>(.*?)</item>").expect("item pattern"));
static RE_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<title><!\[CDATA\[(.*?)\]\]>|<title>(.*?)</title>").expect("title pattern")
});
static RE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<link>(.*?)</link>").expect("link pattern"));
static RE_PUB_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<pubDate>(.*?)</pubDate>").expect("pubDate pattern"));
static RE_SOURCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<source[^>]*>(.*?)</source>").expect("source pattern"));
static RE_DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<description><!\[CDATA\[(.*?)\]\]>|<description>(.*?)</description>")
        .expect("description pattern")
});
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Fields scraped from one `<item>` block. Empty string means "not found".
/// `source` stays empty here; the query fallback is applied on assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub source: String,
    pub description: String,
}

impl RawItem {
    fn scan(block: &str) -> Self {
        Self {
            title: decode(&first_group(&RE_TITLE, block)),
            link: first_group(&RE_LINK, block),
            pub_date: first_group(&RE_PUB_DATE, block),
            source: decode(&first_group(&RE_SOURCE, block)),
            description: strip_markup(&first_group(&RE_DESCRIPTION, block)),
        }
    }

    /// Apply inclusion and defaulting rules. `None` when title or link is missing.
    pub fn into_article(self, query: &str, now_iso: &str) -> Option<Article> {
        if self.title.is_empty() || self.link.is_empty() {
            return None;
        }
        let description = if self.description.is_empty() {
            self.title.clone()
        } else {
            self.description
        };
        Some(Article {
            title: self.title,
            description,
            source: if self.source.is_empty() {
                query.to_string()
            } else {
                self.source
            },
            url: self.link,
            published_at: if self.pub_date.is_empty() {
                now_iso.to_string()
            } else {
                self.pub_date
            },
        })
    }
}

/// Lazily yield one [`RawItem`] per `<item>...</item>` pair in `xml`.
pub fn items(xml: &str) -> impl Iterator<Item = RawItem> + '_ {
    RE_ITEM
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| RawItem::scan(m.as_str()))
}

/// Scrape every usable article from one feed body fetched for `query`.
pub fn extract_articles(xml: &str, query: &str, now_iso: &str) -> Vec<Article> {
    items(xml)
        .filter_map(|it| it.into_article(query, now_iso))
        .collect()
}

// First alternative that participated in the match (CDATA before plain), trimmed.
fn first_group(re: &Regex, haystack: &str) -> String {
    re.captures(haystack)
        .map(|c: Captures<'_>| {
            c.iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str())
                .find(|s| !s.is_empty())
                .unwrap_or_default()
                .trim()
                .to_string()
        })
        .unwrap_or_default()
}

fn decode(s: &str) -> String {
    html_escape::decode_html_entities(s).trim().to_string()
}

/// Feed descriptions are usually entity-escaped HTML, sometimes escaped twice.
fn strip_markup(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let once = html_escape::decode_html_entities(s);
    let no_tags = RE_TAGS.replace_all(&once, "");
    let twice = html_escape::decode_html_entities(&no_tags);
    let no_tags = RE_TAGS.replace_all(&twice, "");
    let no_brackets = no_tags.replace(['<', '>'], "");
    RE_WS.replace_all(&no_brackets, " ").trim().to_string()
}
