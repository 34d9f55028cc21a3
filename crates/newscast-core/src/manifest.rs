//! Episode manifest and the aggregated pipeline report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::story::Pick;

/// Wall-clock timing of one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub duration_ms: u64,
}

/// (topic, count) pair used in report breakdowns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicCount {
    pub topic: String,
    pub count: u32,
}

/// Aggregate safety risk over all script sections. Ordered so `max` picks
/// the most severe level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Ingestion section of the pipeline report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub sources_scanned: u32,
    pub items_seen: u32,
    pub stories_accepted: u32,
    pub stories_filtered: u32,
    #[serde(default)]
    pub topics: Vec<TopicCount>,
}

/// Ranking section of the pipeline report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingSummary {
    pub candidates: u32,
    pub selected: u32,
    #[serde(default)]
    pub distribution: Vec<TopicCount>,
    /// Titles of the top picks in rank order.
    #[serde(default)]
    pub top_picks: Vec<String>,
    /// Reason strings for rejected candidates.
    #[serde(default)]
    pub rejections: Vec<String>,
}

/// Outline section of the pipeline report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutlineSummary {
    pub segments: u32,
    pub opening_hook: String,
    #[serde(default)]
    pub section_titles: Vec<String>,
}

/// Script section of the pipeline report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptSummary {
    pub sections: u32,
    pub word_count: u32,
    pub sources: u32,
}

/// Fact-check and safety section of the pipeline report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewSummary {
    #[serde(default)]
    pub fact_check_edits: Vec<String>,
    #[serde(default)]
    pub safety_edits: Vec<String>,
    #[serde(default)]
    pub risk_level: RiskLevel,
}

/// Per-stage summary attached to the manifest after publication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    pub ingestion: IngestionSummary,
    pub ranking: RankingSummary,
    pub outline: OutlineSummary,
    pub script: ScriptSummary,
    pub review: ReviewSummary,
}

/// The per-run record binding picks, content hashes, the published artifact,
/// and stage metrics. Stored at `episodes/<run_id>_manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeManifest {
    /// Episode date, `YYYY-MM-DD`.
    pub date: String,
    /// Run identifier. Equal to `date`; one run per episode date.
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub picks: Vec<Pick>,
    pub outline_hash: String,
    pub script_hash: String,
    pub audio_hash: String,
    pub mp3_url: String,
    /// Size of the published audio, used for the feed enclosure.
    #[serde(default)]
    pub mp3_bytes: u64,
    pub duration_sec: f64,
    pub word_count: u32,
    #[serde(default)]
    pub timings: Vec<StageTiming>,
    #[serde(default)]
    pub pipeline_report: PipelineReport,
}

impl EpisodeManifest {
    /// Object-store key of the episode audio for a given run.
    pub fn mp3_key(run_id: &str) -> String {
        format!("episodes/{}_daily_rohit_news.mp3", run_id)
    }

    /// Object-store key of the manifest for a given run.
    pub fn manifest_key(run_id: &str) -> String {
        format!("episodes/{}_manifest.json", run_id)
    }
}
