//! Runs index and the concurrency guard
//!
//! A process singleton holds the single active-run slot and mirrors every
//! lifecycle transition into `runs/index.json` (newest first, capped at
//! 100). The guard is advisory for one process; cross-instance exclusion
//! comes from the orchestrator's date-level idempotency check.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;

use newscast_core::{
    EpisodeManifest, Error, ObjectStore, Result, RunStatus, RunSummary, RunsIndex,
};

/// Object-store key of the persisted index.
pub const INDEX_KEY: &str = "runs/index.json";

/// Process-wide run registry.
pub struct RunRegistry {
    store: Arc<dyn ObjectStore>,
    active: Mutex<Option<String>>,
}

impl RunRegistry {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            active: Mutex::new(None),
        }
    }

    /// Currently active run id, if any.
    pub fn active_run(&self) -> Option<String> {
        self.active.lock().clone()
    }

    /// Claim the active slot for `run_id`. Returns false when another run
    /// holds it. On success the index gains a fresh `running` entry.
    pub async fn start_run(&self, run_id: &str, date: &str) -> bool {
        {
            let mut active = self.active.lock();
            if active.is_some() {
                return false;
            }
            *active = Some(run_id.to_string());
        }
        let mut index = self.load_index().await;
        index.prepend(RunSummary::started(run_id, date));
        self.persist_index(&index).await;
        true
    }

    /// Mark the active run successful and release the guard.
    pub async fn complete_run(&self, run_id: &str, manifest: &EpisodeManifest) {
        self.finish(run_id, |summary| {
            summary.status = RunStatus::Success;
            summary.completed_at = Some(Utc::now());
            summary.duration_ms = Some(
                (Utc::now() - summary.started_at).num_milliseconds().max(0) as u64,
            );
            summary.stories_count = Some(manifest.picks.len() as u32);
            summary.episode_url = Some(manifest.mp3_url.clone());
            summary.error = None;
        })
        .await;
    }

    /// Mark the active run failed and release the guard.
    pub async fn fail_run(&self, run_id: &str, error: &str) {
        let error = error.to_string();
        self.finish(run_id, move |summary| {
            summary.status = RunStatus::Failed;
            summary.completed_at = Some(Utc::now());
            summary.duration_ms = Some(
                (Utc::now() - summary.started_at).num_milliseconds().max(0) as u64,
            );
            summary.error = Some(error.clone());
        })
        .await;
    }

    async fn finish(&self, run_id: &str, update: impl Fn(&mut RunSummary)) {
        {
            let mut active = self.active.lock();
            if active.as_deref() == Some(run_id) {
                *active = None;
            }
        }
        let mut index = self.load_index().await;
        match index.runs.iter_mut().find(|r| r.run_id == run_id) {
            Some(summary) => update(summary),
            None => {
                // The running entry can be missing if the index write was
                // lost; synthesize one so the terminal state is recorded.
                let mut summary = RunSummary::started(run_id, run_id);
                update(&mut summary);
                index.runs.insert(0, summary);
            }
        }
        index.runs.truncate(newscast_core::RUNS_INDEX_CAP);
        index.last_updated = Utc::now();
        self.persist_index(&index).await;
    }

    /// A page of run summaries plus the total count.
    pub async fn list(&self, page: usize, page_size: usize) -> (Vec<RunSummary>, usize) {
        let index = self.load_index().await;
        let total = index.runs.len();
        (index.page(page, page_size).to_vec(), total)
    }

    pub async fn get(&self, run_id: &str) -> Option<RunSummary> {
        self.load_index().await.get(run_id).cloned()
    }

    /// Load the manifest for a run from `episodes/<run_id>_manifest.json`.
    pub async fn get_manifest(&self, run_id: &str) -> Result<EpisodeManifest> {
        let raw = self
            .store
            .get(&EpisodeManifest::manifest_key(run_id))
            .await?;
        serde_json::from_slice(&raw)
            .map_err(|err| Error::Storage(format!("decode manifest {run_id}: {err}")))
    }

    /// Remove a run's artifacts and its index entries.
    pub async fn remove(&self, run_id: &str) -> Result<()> {
        self.store
            .delete(&EpisodeManifest::mp3_key(run_id))
            .await?;
        self.store
            .delete(&EpisodeManifest::manifest_key(run_id))
            .await?;
        let mut index = self.load_index().await;
        index.runs.retain(|r| r.run_id != run_id);
        index.last_updated = Utc::now();
        self.persist_index(&index).await;
        Ok(())
    }

    /// Failure to load degrades to an empty index, never an error.
    pub async fn load_index(&self) -> RunsIndex {
        match self.store.get(INDEX_KEY).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "runs index is unreadable, starting empty");
                RunsIndex::default()
            }),
            Err(_) => RunsIndex::default(),
        }
    }

    async fn persist_index(&self, index: &RunsIndex) {
        let body = match serde_json::to_vec_pretty(index) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(error = %err, "runs index serialization failed");
                return;
            }
        };
        if let Err(err) = self
            .store
            .put(INDEX_KEY, Bytes::from(body), "application/json")
            .await
        {
            tracing::error!(error = %err, "runs index persistence failed");
        }
    }
}
