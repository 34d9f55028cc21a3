//! Dashboard configuration
//!
//! The dashboard record is the single source of truth for run parameters:
//! topics and weights, ingestion filters, voices, podcast metadata, and
//! production tuning. It is persisted at `config/config.json` in the object
//! store; environment variables are only a fallback when the stored record
//! cannot be read.

pub mod dashboard;
pub mod settings;
pub mod store;

pub use dashboard::{
    DashboardConfig, PodcastMeta, ProductionTuning, VoiceMap, DEFAULT_TARGET_DURATION_SEC,
    DEFAULT_WINDOW_HOURS,
};
pub use settings::AppSettings;
pub use store::{validate, ConfigStore, CONFIG_KEY};
