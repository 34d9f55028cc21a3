//! Shared application state

use std::sync::Arc;

use newscast_config::{AppSettings, ConfigStore};
use newscast_core::ObjectStore;
use newscast_pipeline::{Orchestrator, ProgressTracker, RunRegistry};

/// Everything the handlers need. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<AppSettings>,
    pub store: Arc<dyn ObjectStore>,
    pub config_store: ConfigStore,
    pub registry: Arc<RunRegistry>,
    pub progress: Arc<ProgressTracker>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(
        settings: AppSettings,
        store: Arc<dyn ObjectStore>,
        config_store: ConfigStore,
        registry: Arc<RunRegistry>,
        progress: Arc<ProgressTracker>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            store,
            config_store,
            registry,
            progress,
            orchestrator,
        }
    }
}
