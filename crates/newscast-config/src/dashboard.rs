//! The versioned dashboard record

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use newscast_core::TopicConfig;

/// Default ingestion window in hours. Valid configurations stay in 36-72.
pub const DEFAULT_WINDOW_HOURS: u32 = 36;

/// Default target episode duration in seconds.
pub const DEFAULT_TARGET_DURATION_SEC: u32 = 900;

fn default_timezone() -> String {
    std::env::var("TIMEZONE").unwrap_or_else(|_| "America/New_York".to_string())
}

fn default_rumor_filter() -> bool {
    env_bool("RUMOR_FILTER", true)
}

fn default_min_content_length() -> usize {
    env_parse("MIN_CONTENT_LENGTH", 100)
}

fn default_max_stories_per_domain() -> usize {
    env_parse("MAX_STORIES_PER_DOMAIN", 2)
}

fn default_window_hours() -> u32 {
    env_parse("WINDOW_HOURS", DEFAULT_WINDOW_HOURS)
}

fn default_target_duration_sec() -> u32 {
    env_parse("TARGET_DURATION_SECONDS", DEFAULT_TARGET_DURATION_SEC)
}

fn env_parse<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

fn env_bool(key: &str, fallback: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => fallback,
    }
}

/// Podcast channel metadata, surfaced in the RSS feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PodcastMeta {
    pub base_url: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub email: String,
    pub language: String,
    pub category: String,
}

impl Default for PodcastMeta {
    fn default() -> Self {
        let var = |key: &str, fallback: &str| {
            std::env::var(key).unwrap_or_else(|_| fallback.to_string())
        };
        Self {
            base_url: var("PODCAST_BASE_URL", "http://localhost:8080"),
            title: var("PODCAST_TITLE", "Daily Rohit News"),
            description: var(
                "PODCAST_DESCRIPTION",
                "A daily audio briefing assembled from fresh reporting on your topics.",
            ),
            author: var("PODCAST_AUTHOR", "Rohit"),
            email: var("PODCAST_EMAIL", "podcast@example.com"),
            language: var("PODCAST_LANGUAGE", "en-us"),
            category: var("PODCAST_CATEGORY", "News"),
        }
    }
}

/// Narration role to provider-voice mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceMap {
    pub host: String,
    pub analyst: String,
    pub stinger: String,
}

impl Default for VoiceMap {
    fn default() -> Self {
        Self {
            host: "shimmer".to_string(),
            analyst: "echo".to_string(),
            stinger: "fable".to_string(),
        }
    }
}

/// Knobs for episode pacing and length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionTuning {
    /// Short beat between sentences within a segment, in milliseconds.
    pub pause_short_ms: u32,
    /// Long beat between segments, in milliseconds.
    pub pause_long_ms: u32,
    pub min_stories: u32,
    pub max_stories: u32,
    /// Free-form style tag forwarded to the outline and script prompts.
    pub style: String,
    /// Object-store key of music prepended to the episode, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_music_key: Option<String>,
    /// Object-store key of music appended to the episode, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro_music_key: Option<String>,
}

impl Default for ProductionTuning {
    fn default() -> Self {
        Self {
            pause_short_ms: 300,
            pause_long_ms: 700,
            min_stories: 5,
            max_stories: 10,
            style: "brisk morning briefing".to_string(),
            intro_music_key: None,
            outro_music_key: None,
        }
    }
}

/// The full user-editable run configuration. Version is bumped on every save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub version: u64,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_by: String,
    pub topics: Vec<TopicConfig>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_rumor_filter")]
    pub rumor_filter: bool,
    #[serde(default)]
    pub banned_domains: Vec<String>,
    #[serde(default = "default_min_content_length")]
    pub min_content_length: usize,
    #[serde(default = "default_max_stories_per_domain")]
    pub max_stories_per_domain: usize,
    #[serde(default)]
    pub voices: VoiceMap,
    /// Token to phonetic expansion, applied during TTS planning.
    #[serde(default)]
    pub pronunciation_glossary: BTreeMap<String, String>,
    #[serde(default)]
    pub podcast: PodcastMeta,
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,
    #[serde(default = "default_target_duration_sec")]
    pub target_duration_sec: u32,
    #[serde(default)]
    pub production: ProductionTuning,
}

impl DashboardConfig {
    /// Fallback record built from environment variables, used when the
    /// stored config cannot be read. Topics default to a conservative
    /// general-news set so a fresh deployment still produces an episode.
    pub fn from_env() -> Self {
        let mut topics = vec![TopicConfig::new("Top Stories", 1.0)];
        topics[0].feeds = vec!["https://news.google.com/rss".to_string()];
        topics[0].keywords = vec!["news".to_string()];
        Self {
            version: 0,
            updated_at: Utc::now(),
            updated_by: "env".to_string(),
            topics,
            timezone: default_timezone(),
            rumor_filter: default_rumor_filter(),
            banned_domains: Vec::new(),
            min_content_length: default_min_content_length(),
            max_stories_per_domain: default_max_stories_per_domain(),
            voices: VoiceMap::default(),
            pronunciation_glossary: BTreeMap::new(),
            podcast: PodcastMeta::default(),
            window_hours: default_window_hours(),
            target_duration_sec: default_target_duration_sec(),
            production: ProductionTuning::default(),
        }
    }

    /// Topics that participate in runs (weight > 0).
    pub fn enabled_topics(&self) -> Vec<&TopicConfig> {
        self.topics.iter().filter(|t| t.enabled()).collect()
    }

    /// Lower-cased label to weight map over enabled topics.
    pub fn topic_weights(&self) -> BTreeMap<String, f64> {
        self.enabled_topics()
            .iter()
            .map(|t| (t.label.to_lowercase(), t.weight))
            .collect()
    }

    /// Scale enabled-topic weights to sum to 1. When every topic weighs
    /// zero, all topics get equal weight instead.
    pub fn normalize_weights(&mut self) {
        let sum: f64 = self.topics.iter().map(|t| t.weight.max(0.0)).sum();
        if sum <= f64::EPSILON {
            let n = self.topics.len().max(1) as f64;
            for topic in &mut self.topics {
                topic.weight = 1.0 / n;
            }
            return;
        }
        for topic in &mut self.topics {
            topic.weight = topic.weight.max(0.0) / sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg_with_weights(weights: &[f64]) -> DashboardConfig {
        let mut cfg = DashboardConfig::from_env();
        cfg.topics = weights
            .iter()
            .enumerate()
            .map(|(i, w)| TopicConfig::new(format!("T{i}"), *w))
            .collect();
        cfg
    }

    #[test]
    fn normalize_scales_to_one() {
        let mut cfg = cfg_with_weights(&[2.0, 1.0, 1.0]);
        cfg.normalize_weights();
        let sum: f64 = cfg.topics.iter().map(|t| t.weight).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((cfg.topics[0].weight - 0.5).abs() < 1e-9);
    }

    #[test]
    fn normalize_all_zero_gives_equal_weights() {
        let mut cfg = cfg_with_weights(&[0.0, 0.0, 0.0, 0.0]);
        cfg.normalize_weights();
        for topic in &cfg.topics {
            assert!((topic.weight - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn enabled_topics_excludes_zero_weight() {
        let cfg = cfg_with_weights(&[0.5, 0.0, 0.5]);
        let enabled = cfg.enabled_topics();
        assert_eq!(enabled.len(), 2);
        assert!(enabled.iter().all(|t| t.weight > 0.0));
    }
}
