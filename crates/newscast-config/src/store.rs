//! Config store over the object store

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;

use newscast_core::{Error, ObjectStore, Result};

use crate::dashboard::DashboardConfig;

/// Object-store key of the dashboard record.
pub const CONFIG_KEY: &str = "config/config.json";

/// Tolerance for the enabled-weight sum invariant.
const WEIGHT_SUM_EPS: f64 = 1e-3;

/// Validate a dashboard record against the save-time invariants.
///
/// The weight-sum check treats an all-zero configuration as valid because
/// [`DashboardConfig::normalize_weights`] rewrites it to equal weights.
pub fn validate(cfg: &DashboardConfig) -> Result<()> {
    validate_pre_normalize(cfg)?;
    let enabled_sum: f64 = cfg
        .topics
        .iter()
        .filter(|t| t.enabled())
        .map(|t| t.weight)
        .sum();
    let all_zero = cfg.topics.iter().all(|t| t.weight == 0.0);
    if !all_zero && (enabled_sum - 1.0).abs() > WEIGHT_SUM_EPS {
        return Err(Error::Validation(format!(
            "enabled topic weights sum to {enabled_sum:.4}, expected 1.0"
        )));
    }
    Ok(())
}

/// Loads and saves the dashboard record through the object store.
///
/// Callers must treat the stored record as the single source of truth at run
/// start; the environment fallback only applies when the read fails.
#[derive(Clone)]
pub struct ConfigStore {
    store: Arc<dyn ObjectStore>,
}

impl ConfigStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Read `config/config.json`, falling back to the environment-derived
    /// default when the key is absent or unreadable.
    pub async fn load(&self) -> DashboardConfig {
        match self.store.get(CONFIG_KEY).await {
            Ok(raw) => match serde_json::from_slice::<DashboardConfig>(&raw) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!(error = %err, "stored config is unreadable, using env defaults");
                    DashboardConfig::from_env()
                }
            },
            Err(err) => {
                tracing::info!(error = %err, "no stored config, using env defaults");
                DashboardConfig::from_env()
            }
        }
    }

    /// Validate, normalize weights, bump the version, stamp authorship, and
    /// persist. Returns the stored record.
    pub async fn save(&self, mut cfg: DashboardConfig, user: &str) -> Result<DashboardConfig> {
        // Range/label/timezone checks happen before normalization so a wild
        // weight is rejected rather than silently rescaled. The sum check is
        // re-established by normalize_weights below.
        validate_pre_normalize(&cfg)?;
        cfg.normalize_weights();
        validate(&cfg)?;

        let prior = self.load().await;
        cfg.version = prior.version + 1;
        cfg.updated_at = Utc::now();
        cfg.updated_by = user.to_string();

        let body = serde_json::to_vec_pretty(&cfg)
            .map_err(|err| Error::Storage(format!("serialize config: {err}")))?;
        self.store
            .put(CONFIG_KEY, Bytes::from(body), "application/json")
            .await?;
        tracing::info!(version = cfg.version, user, "dashboard config saved");
        Ok(cfg)
    }
}

/// The subset of [`validate`] that must hold before weight normalization.
fn validate_pre_normalize(cfg: &DashboardConfig) -> Result<()> {
    if cfg.topics.is_empty() {
        return Err(Error::Validation("topic list is empty".into()));
    }
    let mut labels = HashSet::new();
    for topic in &cfg.topics {
        let label = topic.label.trim();
        if label.is_empty() {
            return Err(Error::Validation("topic label is empty".into()));
        }
        if !labels.insert(label.to_lowercase()) {
            return Err(Error::Validation(format!("duplicate topic label: {label}")));
        }
        if !(0.0..=1.0).contains(&topic.weight) {
            return Err(Error::Validation(format!(
                "topic {label} weight {} outside [0, 1]",
                topic.weight
            )));
        }
    }
    if cfg.timezone.trim().is_empty() {
        return Err(Error::Validation("timezone is missing".into()));
    }
    if cfg.timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(Error::Validation(format!(
            "unknown timezone: {}",
            cfg.timezone
        )));
    }
    let base = &cfg.podcast.base_url;
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(Error::Validation(format!(
            "podcast base url must be http(s): {base}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use newscast_core::TopicConfig;
    use newscast_storage::MemoryObjectStore;

    fn three_topics() -> Vec<TopicConfig> {
        vec![
            TopicConfig::new("AI", 0.5),
            TopicConfig::new("VZ", 0.3),
            TopicConfig::new("ACN", 0.2),
        ]
    }

    fn store() -> ConfigStore {
        ConfigStore::new(Arc::new(MemoryObjectStore::new("http://test.local")))
    }

    #[tokio::test]
    async fn save_bumps_version_and_round_trips() {
        let store = store();
        let mut cfg = DashboardConfig::from_env();
        cfg.topics = three_topics();

        let saved = store.save(cfg.clone(), "alice").await.unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(saved.updated_by, "alice");
        let sum: f64 = saved.topics.iter().map(|t| t.weight).sum();
        assert!((sum - 1.0).abs() < 1e-3);

        let loaded = store.load().await;
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.topics, saved.topics);

        let again = store.save(loaded, "bob").await.unwrap();
        assert_eq!(again.version, 2);
    }

    #[tokio::test]
    async fn load_missing_falls_back_to_env() {
        let loaded = store().load().await;
        assert_eq!(loaded.version, 0);
        assert!(!loaded.topics.is_empty());
    }

    #[tokio::test]
    async fn save_rejects_duplicate_labels() {
        let store = store();
        let mut cfg = DashboardConfig::from_env();
        cfg.topics = vec![TopicConfig::new("AI", 0.5), TopicConfig::new("ai", 0.5)];
        let err = store.save(cfg, "alice").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn save_rejects_out_of_range_weight() {
        let store = store();
        let mut cfg = DashboardConfig::from_env();
        cfg.topics = vec![TopicConfig::new("AI", 1.5)];
        assert!(store.save(cfg, "alice").await.is_err());
    }

    #[test]
    fn validate_rejects_bad_sum() {
        let mut cfg = DashboardConfig::from_env();
        cfg.topics = vec![TopicConfig::new("AI", 0.5), TopicConfig::new("VZ", 0.2)];
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn validate_rejects_bad_timezone_and_url() {
        let mut cfg = DashboardConfig::from_env();
        cfg.topics = three_topics();
        cfg.timezone = "Mars/Olympus".into();
        assert!(validate(&cfg).is_err());

        let mut cfg = DashboardConfig::from_env();
        cfg.topics = three_topics();
        cfg.podcast.base_url = "ftp://example.com".into();
        assert!(validate(&cfg).is_err());
    }
}
