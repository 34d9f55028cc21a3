//! Listener memory hook
//!
//! Post-publication bookkeeping: tracks which topics the listener has been
//! served so future prompts can bias against repetition. Runs after
//! publish and never fails the run.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use newscast_core::{Error, Result};

use crate::agent::{Agent, AgentContext};

/// Object-store key of the listener profile.
pub const PROFILE_KEY: &str = "memory/listener_profile.json";

/// Accumulated listener exposure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerProfile {
    /// Topic label to number of picks served.
    #[serde(default)]
    pub topic_exposure: BTreeMap<String, u32>,
    #[serde(default)]
    pub episodes_total: u32,
    #[serde(default)]
    pub last_episode_date: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Memory hook input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryInput {
    pub date: String,
    /// Topic of every published pick, one entry per pick.
    pub pick_topics: Vec<String>,
}

/// Memory hook agent.
pub struct MemoryAgent;

#[async_trait]
impl Agent for MemoryAgent {
    type Input = MemoryInput;
    type Output = ListenerProfile;

    fn name(&self) -> &'static str {
        "MemoryAgent"
    }

    async fn process(&self, ctx: &AgentContext, input: &MemoryInput) -> Result<ListenerProfile> {
        let mut profile = match ctx.store.get(PROFILE_KEY).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_default(),
            Err(_) => ListenerProfile::default(),
        };

        for topic in &input.pick_topics {
            *profile.topic_exposure.entry(topic.clone()).or_default() += 1;
        }
        profile.episodes_total += 1;
        profile.last_episode_date = Some(input.date.clone());
        profile.updated_at = Some(Utc::now());

        let body = serde_json::to_vec_pretty(&profile)
            .map_err(|err| Error::Storage(format!("serialize profile: {err}")))?;
        ctx.store
            .put(PROFILE_KEY, Bytes::from(body), "application/json")
            .await?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newscast_storage::MemoryObjectStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn accumulates_exposure_across_runs() {
        let store = Arc::new(MemoryObjectStore::new("mem://bucket"));
        let ctx = crate::agent::test_support::context_with_store(store.clone());

        let first = MemoryAgent
            .process(
                &ctx,
                &MemoryInput {
                    date: "2026-08-01".into(),
                    pick_topics: vec!["AI".into(), "AI".into(), "VZ".into()],
                },
            )
            .await
            .unwrap();
        assert_eq!(first.topic_exposure["AI"], 2);
        assert_eq!(first.episodes_total, 1);

        let second = MemoryAgent
            .process(
                &ctx,
                &MemoryInput {
                    date: "2026-08-02".into(),
                    pick_topics: vec!["AI".into()],
                },
            )
            .await
            .unwrap();
        assert_eq!(second.topic_exposure["AI"], 3);
        assert_eq!(second.episodes_total, 2);
        assert_eq!(second.last_episode_date.as_deref(), Some("2026-08-02"));
    }
}
