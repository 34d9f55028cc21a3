//! Run lifecycle records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of summaries kept in the persisted runs index.
pub const RUNS_INDEX_CAP: usize = 100;

/// Terminal and in-flight states of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

/// One entry of the runs index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    /// Episode date, `YYYY-MM-DD`.
    pub date: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stories_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSummary {
    /// A fresh `running` entry for a run starting now.
    pub fn started(run_id: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            date: date.into(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            stories_count: None,
            episode_url: None,
            error: None,
        }
    }
}

/// The append-only (newest first) sequence of run summaries, capped at
/// [`RUNS_INDEX_CAP`]. Persisted at `runs/index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunsIndex {
    pub runs: Vec<RunSummary>,
    pub last_updated: DateTime<Utc>,
}

impl Default for RunsIndex {
    fn default() -> Self {
        Self {
            runs: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

impl RunsIndex {
    /// Prepend a summary, truncate to the cap, and stamp `last_updated`.
    pub fn prepend(&mut self, summary: RunSummary) {
        self.runs.insert(0, summary);
        self.runs.truncate(RUNS_INDEX_CAP);
        self.last_updated = Utc::now();
    }

    /// Replace the newest entry matching `run_id`, or prepend when absent.
    pub fn upsert(&mut self, summary: RunSummary) {
        match self.runs.iter_mut().find(|r| r.run_id == summary.run_id) {
            Some(slot) => *slot = summary,
            None => self.runs.insert(0, summary),
        }
        self.runs.truncate(RUNS_INDEX_CAP);
        self.last_updated = Utc::now();
    }

    pub fn get(&self, run_id: &str) -> Option<&RunSummary> {
        self.runs.iter().find(|r| r.run_id == run_id)
    }

    /// A page of summaries, newest first. Pages are 1-based.
    pub fn page(&self, page: usize, page_size: usize) -> &[RunSummary] {
        let page = page.max(1);
        let start = (page - 1).saturating_mul(page_size);
        if start >= self.runs.len() {
            return &[];
        }
        let end = (start + page_size).min(self.runs.len());
        &self.runs[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepend_caps_at_100() {
        let mut index = RunsIndex::default();
        for i in 0..120 {
            index.prepend(RunSummary::started(format!("run-{i}"), "2026-01-01"));
        }
        assert_eq!(index.runs.len(), RUNS_INDEX_CAP);
        // Newest first
        assert_eq!(index.runs[0].run_id, "run-119");
    }

    #[test]
    fn paging() {
        let mut index = RunsIndex::default();
        for i in 0..25 {
            index.prepend(RunSummary::started(format!("run-{i}"), "2026-01-01"));
        }
        assert_eq!(index.page(1, 10).len(), 10);
        assert_eq!(index.page(3, 10).len(), 5);
        assert!(index.page(4, 10).is_empty());
        assert_eq!(index.page(1, 10)[0].run_id, "run-24");
    }
}
