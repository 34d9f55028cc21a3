//! The ingestion filter chain
//!
//! Filters run in a fixed order and the first rejection wins: missing
//! fields, duplicate URL, banned domain, age window, quality, source tier,
//! keyword match. Google News items are pre-curated and skip the quality
//! and keyword filters.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use newscast_core::{SourceTier, Story};

/// Spam phrases that reject a title outright.
const SPAM_PHRASES: &[&str] = &[
    "click here",
    "you won't believe",
    "shocking",
    "one weird trick",
];

/// Share of non-ASCII characters above which content is rejected.
const MAX_NON_ASCII_RATIO: f64 = 0.30;

/// Per-run filter settings, derived from the dashboard record.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub min_content_length: usize,
    pub banned_domains: Vec<String>,
    /// Oldest acceptable publish instant.
    pub cutoff: DateTime<Utc>,
    /// Reference clock for age reporting.
    pub now: DateTime<Utc>,
}

/// Outcome of running the chain on one story.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Accepted,
    Rejected(String),
}

impl FilterOutcome {
    pub fn rejected(reason: impl Into<String>) -> Self {
        FilterOutcome::Rejected(reason.into())
    }
}

/// Run the filter chain for one normalized story.
///
/// `seen_urls` is the per-run duplicate set; the caller inserts the URL
/// after an accept. `keywords` are the originating topic's match terms.
pub fn apply_filters(
    story: &Story,
    options: &FilterOptions,
    seen_urls: &HashSet<String>,
    keywords: &[String],
    from_google_news: bool,
) -> FilterOutcome {
    if story.url.is_empty() || story.title.is_empty() {
        return FilterOutcome::rejected("Missing required fields");
    }

    if seen_urls.contains(&story.url) {
        return FilterOutcome::rejected("Duplicate URL");
    }

    if options
        .banned_domains
        .iter()
        .any(|banned| story.domain.contains(banned.as_str()))
    {
        return FilterOutcome::rejected(format!("Banned domain ({})", story.domain));
    }

    if story.published_at < options.cutoff {
        return FilterOutcome::rejected(format!(
            "Outside time window ({:.1} hours old)",
            story.age_hours(options.now)
        ));
    }

    if !from_google_news {
        if let Some(reason) = quality_rejection(story, options.min_content_length) {
            return FilterOutcome::rejected(reason);
        }
    }

    let tier = SourceTier::classify(&story.domain);
    if !tier.accepted() {
        let label = match tier {
            SourceTier::Tier3 => "3",
            SourceTier::Tier5 => "5",
            _ => unreachable!("only tiers 3 and 5 are rejected"),
        };
        return FilterOutcome::rejected(format!("Excluded source tier (tier {label})"));
    }

    if !from_google_news && !keyword_match(story, keywords) {
        return FilterOutcome::rejected("No topic keyword match");
    }

    FilterOutcome::Accepted
}

/// Quality gate: content length, spam phrases, non-ASCII share.
fn quality_rejection(story: &Story, min_content_length: usize) -> Option<String> {
    let content = story
        .summary
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&story.title);

    if content.chars().count() < min_content_length {
        return Some("Failed quality filter (content too short)".to_string());
    }

    let title_lower = story.title.to_lowercase();
    if SPAM_PHRASES.iter().any(|p| title_lower.contains(p)) {
        return Some("Failed quality filter (spam phrase in title)".to_string());
    }

    let total = content.chars().count();
    if total > 0 {
        let non_ascii = content.chars().filter(|c| !c.is_ascii()).count();
        if (non_ascii as f64) / (total as f64) > MAX_NON_ASCII_RATIO {
            return Some("Failed quality filter (mostly non-ASCII)".to_string());
        }
    }

    None
}

/// Case-insensitive substring test: at least one topic keyword in
/// title+summary. An empty keyword list matches everything.
fn keyword_match(story: &Story, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let haystack = format!(
        "{} {}",
        story.title,
        story.summary.as_deref().unwrap_or_default()
    )
    .to_lowercase();
    keywords
        .iter()
        .any(|k| !k.is_empty() && haystack.contains(&k.to_lowercase()))
}
