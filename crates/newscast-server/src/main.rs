//! Server binary
//!
//! Wires the object store, provider clients, and the orchestrator into the
//! axum router and serves it.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use newscast_config::{AppSettings, ConfigStore};
use newscast_core::ObjectStore;
use newscast_ingest::HttpFeedFetcher;
use newscast_llm::{OpenAiChatModel, OpenAiClient, OpenAiConfig, OpenAiEmbeddings, OpenAiSpeech};
use newscast_pipeline::{Orchestrator, ProgressTracker, RunRegistry};
use newscast_storage::{MemoryObjectStore, S3Config, S3ObjectStore};

use newscast_server::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = AppSettings::from_env();

    let store = build_store(&settings).await?;
    let config_store = ConfigStore::new(store.clone());
    let registry = Arc::new(RunRegistry::new(store.clone()));
    let progress = Arc::new(ProgressTracker::new());

    let openai = OpenAiClient::new(OpenAiConfig::with_api_key(
        settings.openai_api_key.clone().unwrap_or_default(),
    ))
    .context("build OpenAI client")?;
    let llm = Arc::new(OpenAiChatModel::new(openai.clone()));
    let embeddings = Arc::new(OpenAiEmbeddings::new(openai.clone()));
    let synthesizer = Arc::new(OpenAiSpeech::new(openai));
    let fetcher = Arc::new(HttpFeedFetcher::new().context("build feed fetcher")?);

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        config_store.clone(),
        registry.clone(),
        progress.clone(),
        llm,
        embeddings,
        synthesizer,
        fetcher,
        settings.force_overwrite,
    ));

    // Progress snapshots are only useful while a run is fresh.
    let sweeper = progress.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            sweeper.clear_old_runs();
        }
    });

    let listen_addr = settings.listen_addr.clone();
    let state = AppState::new(
        settings,
        store,
        config_store,
        registry,
        progress,
        orchestrator,
    );
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("bind {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "newscast server listening");
    axum::serve(listener, router).await.context("serve")?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,newscast=debug"));
    let json_logs = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn build_store(settings: &AppSettings) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match settings.storage_backend.as_str() {
        "memory" => {
            tracing::warn!("using the in-memory object store; artifacts will not survive restart");
            Ok(Arc::new(MemoryObjectStore::new("memory://newscast")))
        }
        _ => {
            let store = S3ObjectStore::new(S3Config {
                bucket: settings.s3.bucket.clone(),
                region: settings.s3.region.clone(),
                endpoint: settings.s3.endpoint.clone(),
                access_key: settings.s3.access_key.clone(),
                secret_key: settings.s3.secret_key.clone(),
                public_base_url: None,
            })
            .await
            .context("build S3 object store")?;
            Ok(Arc::new(store))
        }
    }
}
