//! In-memory run progress
//!
//! Process-local and lossy on restart; the status API reads the latest
//! snapshot per run. Progress percent comes from a fixed phase table.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Pipeline phases in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Starting,
    Ingestion,
    Ranking,
    Outline,
    Scriptwriting,
    FactCheck,
    Safety,
    Tts,
    Audio,
    Publishing,
    Complete,
}

impl Phase {
    /// Fixed progress percent per phase.
    pub fn percent(self) -> u8 {
        match self {
            Phase::Starting => 5,
            Phase::Ingestion => 15,
            Phase::Ranking => 25,
            Phase::Outline => 35,
            Phase::Scriptwriting => 50,
            Phase::FactCheck => 60,
            Phase::Safety => 65,
            Phase::Tts => 70,
            Phase::Audio => 85,
            Phase::Publishing => 95,
            Phase::Complete => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::Ingestion => "ingestion",
            Phase::Ranking => "ranking",
            Phase::Outline => "outline",
            Phase::Scriptwriting => "scriptwriting",
            Phase::FactCheck => "fact_check",
            Phase::Safety => "safety",
            Phase::Tts => "tts",
            Phase::Audio => "audio",
            Phase::Publishing => "publishing",
            Phase::Complete => "complete",
        }
    }
}

/// Outcome of one progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Started,
    Completed,
    Failed,
}

/// Overall run status as seen by the progress API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Running,
    Completed,
    Failed,
}

/// One timestamped progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub phase: Phase,
    pub status: UpdateStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of one run's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunProgress {
    pub run_id: String,
    pub status: ProgressStatus,
    pub current_phase: Phase,
    /// 0-100.
    pub progress: u8,
    pub updates: Vec<ProgressUpdate>,
    pub started_at: DateTime<Utc>,
}

/// Tracker keyed by run id.
#[derive(Default)]
pub struct ProgressTracker {
    runs: DashMap<String, RunProgress>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an update and recompute status and percent.
    pub fn add_update(
        &self,
        run_id: &str,
        phase: Phase,
        status: UpdateStatus,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) {
        let update = ProgressUpdate {
            phase,
            status,
            message: message.into(),
            details,
            timestamp: Utc::now(),
        };
        let mut entry = self
            .runs
            .entry(run_id.to_string())
            .or_insert_with(|| RunProgress {
                run_id: run_id.to_string(),
                status: ProgressStatus::Running,
                current_phase: phase,
                progress: 0,
                updates: Vec::new(),
                started_at: Utc::now(),
            });
        entry.current_phase = phase;
        entry.progress = phase.percent();
        if status == UpdateStatus::Failed {
            entry.status = ProgressStatus::Failed;
        } else if entry.status != ProgressStatus::Failed && entry.progress >= 100 {
            entry.status = ProgressStatus::Completed;
        }
        entry.updates.push(update);
    }

    pub fn get(&self, run_id: &str) -> Option<RunProgress> {
        self.runs.get(run_id).map(|entry| entry.clone())
    }

    /// Evict runs started more than one hour ago.
    pub fn clear_old_runs(&self) {
        let cutoff = Utc::now() - Duration::hours(1);
        self.runs.retain(|_, progress| progress.started_at >= cutoff);
    }
}
