//! Candidate stories and ranked picks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::sha256_hex;

/// A candidate article discovered during ingestion.
///
/// Stories are created by the ingestion stage and immutable afterwards. The
/// id is derived from the canonical URL so re-ingesting the same article
/// always yields the same id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Story {
    /// Stable 16-hex id derived from the URL.
    pub id: String,
    pub url: String,
    pub title: String,
    /// Human-readable source label ("Reuters", "TechCrunch").
    pub source: String,
    /// Lowercased domain with any leading "www." stripped.
    pub domain: String,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Scraped full text. Optional and unpopulated by the current pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    /// Label of the topic whose feed produced this story.
    pub topic: String,
}

impl Story {
    /// Build a story from normalized parts. The id and domain are derived
    /// from the URL; callers may overwrite `domain` afterwards (Google News
    /// recovery does).
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        source: impl Into<String>,
        published_at: DateTime<Utc>,
        topic: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let domain = domain_of_url(&url).unwrap_or_default();
        Self {
            id: story_id(&url),
            url,
            title: title.into(),
            source: source.into(),
            domain,
            published_at,
            summary: None,
            full_text: None,
            topic: topic.into(),
        }
    }

    /// Age of the story relative to `now`, in fractional hours. Never negative.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        let secs = (now - self.published_at).num_seconds();
        (secs.max(0) as f64) / 3600.0
    }

    /// Text used for embedding: `"title. summary"`.
    pub fn embedding_text(&self) -> String {
        match &self.summary {
            Some(summary) if !summary.is_empty() => format!("{}. {}", self.title, summary),
            _ => self.title.clone(),
        }
    }
}

/// Stable story id: first 16 hex characters of SHA-256 of the URL.
pub fn story_id(url: &str) -> String {
    sha256_hex(url.as_bytes())[..16].to_string()
}

/// Lowercase a host and strip one leading `www.`.
pub fn normalize_domain(host: &str) -> String {
    let lower = host.trim().to_lowercase();
    lower.strip_prefix("www.").unwrap_or(&lower).to_string()
}

/// Extract the normalized domain from a URL, if it parses.
pub fn domain_of_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed.host_str().map(normalize_domain)
}

/// A story chosen for inclusion in the episode, with its ranking outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    pub story: Story,
    /// Topic the pick is counted under (normally `story.topic`).
    pub topic: String,
    /// Final composite score from the ranking formula.
    pub score: f64,
    /// Short explanation of why the story was selected.
    pub rationale: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_id_is_stable_16_hex() {
        let a = story_id("https://example.com/a");
        let b = story_id("https://example.com/a");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, story_id("https://example.com/b"));
    }

    #[test]
    fn domain_normalization() {
        assert_eq!(normalize_domain("WWW.Reuters.com"), "reuters.com");
        assert_eq!(normalize_domain("news.google.com"), "news.google.com");
        assert_eq!(
            domain_of_url("https://www.example.com/path?x=1").as_deref(),
            Some("example.com")
        );
        assert_eq!(domain_of_url("not a url"), None);
    }

    #[test]
    fn embedding_text_includes_summary() {
        let mut story = Story::new(
            "https://example.com/a",
            "Title",
            "Example",
            Utc::now(),
            "AI",
        );
        assert_eq!(story.embedding_text(), "Title");
        story.summary = Some("Summary".into());
        assert_eq!(story.embedding_text(), "Title. Summary");
    }
}
