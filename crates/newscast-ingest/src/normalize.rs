//! Feed item normalization
//!
//! Turns a feed-rs entry into a [`Story`], including the Google News domain
//! recovery: aggregator links hide the true source behind
//! `news.google.com/rss/articles/...`, but the item title carries a
//! `"Title - Source"` suffix we can mine for the real outlet.

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;

use newscast_core::{normalize_domain, Story};

/// Whether a configured feed URL points at the Google News aggregator.
/// Items from such feeds are pre-curated and skip the quality and keyword
/// filters.
pub fn is_google_news_feed(feed_url: &str) -> bool {
    feed_url.contains("news.google.com")
}

/// Whether an item link is a Google News redirect article.
fn is_google_news_link(url: &str) -> bool {
    url.contains("news.google.com/rss/articles/")
}

/// Recover the source domain from a Google News title suffix.
///
/// The aggregator formats titles as `"Headline - Source"`. The text after
/// the last `" - "` is lowercased, stripped of `www.`, and treated as a
/// domain when it already contains a dot; otherwise the source name is
/// collapsed (`"The Verge"` → `theverge`) and given a `.com`.
pub fn recover_google_news_domain(title: &str) -> Option<String> {
    let (_, source) = title.rsplit_once(" - ")?;
    let source = source.trim();
    if source.is_empty() {
        return None;
    }
    let lowered = normalize_domain(source);
    if lowered.contains('.') {
        return Some(lowered);
    }
    let collapsed: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if collapsed.is_empty() {
        None
    } else {
        Some(format!("{collapsed}.com"))
    }
}

/// Normalize one feed entry into a story, or `None` when the mandatory
/// fields are missing. Filtering happens later; this only shapes the data.
pub fn normalize_entry(
    entry: &Entry,
    topic: &str,
    source_label: &str,
    fallback_published: DateTime<Utc>,
) -> Option<Story> {
    let url = entry.links.first().map(|l| l.href.clone())?;
    let title = entry.title.as_ref().map(|t| t.content.trim().to_string())?;
    if url.is_empty() || title.is_empty() {
        return None;
    }

    let published = entry
        .published
        .or(entry.updated)
        .unwrap_or(fallback_published);

    let mut story = Story::new(&url, title, source_label, published, topic);
    story.summary = entry
        .summary
        .as_ref()
        .map(|s| strip_tags(&s.content))
        .filter(|s| !s.is_empty());

    if is_google_news_link(&url) {
        if let Some(domain) = recover_google_news_domain(&story.title) {
            story.domain = domain;
        }
        // Otherwise the news.google.com domain stands.
    }

    Some(story)
}

/// Crude tag stripper for feed summaries; enough for length and keyword
/// checks, not a sanitizer.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
