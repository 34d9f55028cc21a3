//! Publication stage
//!
//! Uploads the episode audio, writes the manifest, and regenerates the
//! feed document from the 30 most recent manifests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;

use newscast_config::PodcastMeta;
use newscast_core::{EpisodeManifest, Result};

use crate::agent::{Agent, AgentContext};
use crate::feed::{episode_from_manifest, render_feed, FeedEpisode};

/// Object-store key of the feed document.
pub const FEED_KEY: &str = "feed.xml";

/// Manifests considered when regenerating the feed.
const FEED_WINDOW: usize = 30;

/// Publication input. The audio rides along in memory and stays out of the
/// persisted envelope.
#[derive(Debug, Clone, Serialize)]
pub struct PublishInput {
    /// Manifest draft; `mp3_url` and `mp3_bytes` are filled here.
    pub manifest: EpisodeManifest,
    pub podcast: PodcastMeta,
    #[serde(skip)]
    pub audio: Bytes,
}

/// Publication output.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutput {
    pub manifest: EpisodeManifest,
    /// Items in the regenerated feed.
    pub feed_items: u32,
}

/// Publication agent.
pub struct PublishAgent;

#[async_trait]
impl Agent for PublishAgent {
    type Input = PublishInput;
    type Output = PublishOutput;

    fn name(&self) -> &'static str {
        "PublishAgent"
    }

    async fn process(&self, ctx: &AgentContext, input: &PublishInput) -> Result<PublishOutput> {
        let mut manifest = input.manifest.clone();
        let run_id = manifest.run_id.clone();

        let mp3_url = ctx
            .store
            .put(
                &EpisodeManifest::mp3_key(&run_id),
                input.audio.clone(),
                "audio/mpeg",
            )
            .await?;
        manifest.mp3_url = mp3_url;
        manifest.mp3_bytes = input.audio.len() as u64;

        let body = serde_json::to_vec_pretty(&manifest)
            .map_err(|err| newscast_core::Error::Storage(format!("serialize manifest: {err}")))?;
        ctx.store
            .put(
                &EpisodeManifest::manifest_key(&run_id),
                Bytes::from(body),
                "application/json",
            )
            .await?;

        let feed_items = rebuild_feed(ctx, &input.podcast).await?;
        tracing::info!(run_id = %run_id, feed_items, "episode published");
        Ok(PublishOutput {
            manifest,
            feed_items,
        })
    }
}

/// Regenerate `feed.xml` from the newest manifests. Unreadable manifests
/// are skipped with a warning.
pub async fn rebuild_feed(ctx: &AgentContext, podcast: &PodcastMeta) -> Result<u32> {
    let keys = ctx.store.list("episodes/").await?;
    let mut manifests: Vec<EpisodeManifest> = Vec::new();
    for key in keys.iter().filter(|k| k.ends_with("_manifest.json")) {
        let raw = match ctx.store.get(key).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key, error = %err, "manifest read failed during feed rebuild");
                continue;
            }
        };
        match serde_json::from_slice::<EpisodeManifest>(&raw) {
            Ok(manifest) => manifests.push(manifest),
            Err(err) => tracing::warn!(key, error = %err, "manifest decode failed, skipping"),
        }
    }

    manifests.sort_by(|a, b| b.date.cmp(&a.date));
    manifests.truncate(FEED_WINDOW);

    let episodes: Vec<FeedEpisode> = manifests
        .iter()
        .map(|m| episode_from_manifest(m, &podcast.title))
        .collect();
    let xml = render_feed(podcast, &episodes, Utc::now());
    ctx.store
        .put(FEED_KEY, Bytes::from(xml), "application/rss+xml; charset=utf-8")
        .await?;
    Ok(episodes.len() as u32)
}
