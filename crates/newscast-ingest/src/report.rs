//! Ingestion report types

use serde::{Deserialize, Serialize};

use newscast_core::{Story, TopicCount};

/// Outcome of scanning one feed URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceScan {
    pub url: String,
    pub topic: String,
    pub items: u32,
    /// "ok", or "error: ..." with the fetch failure.
    pub status: String,
}

impl SourceScan {
    pub fn succeeded(&self) -> bool {
        self.status == "ok"
    }
}

/// One rejected feed item and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredItem {
    pub url: String,
    pub title: String,
    pub topic: String,
    pub reason: String,
}

/// Accept/reject record per normalized story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: String,
    pub title: String,
    pub domain: String,
    pub topic: String,
    pub accepted: bool,
    #[serde(default)]
    pub note: String,
}

/// The detailed ingestion report persisted in the agent envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionReport {
    pub sources: Vec<SourceScan>,
    pub total_items: u32,
    pub filtered: Vec<FilteredItem>,
    /// Accepted stories per topic.
    pub topics: Vec<TopicCount>,
    pub records: Vec<StoryRecord>,
}

impl IngestionReport {
    pub fn accepted_count(&self) -> u32 {
        self.records.iter().filter(|r| r.accepted).count() as u32
    }

    pub(crate) fn bump_topic(&mut self, topic: &str) {
        match self.topics.iter_mut().find(|t| t.topic == topic) {
            Some(entry) => entry.count += 1,
            None => self.topics.push(TopicCount {
                topic: topic.to_string(),
                count: 1,
            }),
        }
    }
}

/// Ingestion stage output: the accepted stories plus the detailed report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionOutput {
    pub stories: Vec<Story>,
    pub report: IngestionReport,
}
