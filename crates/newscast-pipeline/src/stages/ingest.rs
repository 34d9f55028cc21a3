//! Ingestion stage adapter

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use newscast_core::{Result, TopicConfig};
use newscast_ingest::{IngestOptions, IngestionOutput, Ingestor};

use crate::agent::{Agent, AgentContext};

/// Ingestion stage input snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestInput {
    pub topics: Vec<TopicConfig>,
    pub cutoff: DateTime<Utc>,
    pub window_hours: u32,
    pub min_content_length: usize,
    pub max_stories_per_domain: usize,
    pub banned_domains: Vec<String>,
}

/// Wraps [`Ingestor`] in the agent envelope.
pub struct IngestAgent {
    ingestor: Arc<Ingestor>,
}

impl IngestAgent {
    pub fn new(ingestor: Arc<Ingestor>) -> Self {
        Self { ingestor }
    }
}

#[async_trait]
impl Agent for IngestAgent {
    type Input = IngestInput;
    type Output = IngestionOutput;

    fn name(&self) -> &'static str {
        "IngestionAgent"
    }

    async fn process(&self, ctx: &AgentContext, input: &IngestInput) -> Result<IngestionOutput> {
        let options = IngestOptions {
            min_content_length: input.min_content_length,
            max_stories_per_domain: input.max_stories_per_domain,
            banned_domains: input.banned_domains.clone(),
        };
        self.ingestor
            .ingest(&input.topics, input.cutoff, &options, &ctx.cancel)
            .await
    }
}
