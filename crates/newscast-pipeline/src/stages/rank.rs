//! Ranking stage adapter

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use newscast_core::{Result, Story, TopicConfig};
use newscast_rank::{RankOutput, Ranker};

use crate::agent::{Agent, AgentContext};

/// Ranking stage input snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankInput {
    pub stories: Vec<Story>,
    pub topics: Vec<TopicConfig>,
    pub target_count: usize,
}

/// Wraps [`Ranker`] in the agent envelope.
pub struct RankAgent {
    ranker: Arc<Ranker>,
}

impl RankAgent {
    pub fn new(ranker: Arc<Ranker>) -> Self {
        Self { ranker }
    }
}

#[async_trait]
impl Agent for RankAgent {
    type Input = RankInput;
    type Output = RankOutput;

    fn name(&self) -> &'static str {
        "RankingAgent"
    }

    async fn process(&self, _ctx: &AgentContext, input: &RankInput) -> Result<RankOutput> {
        self.ranker
            .rank(&input.stories, &input.topics, input.target_count)
            .await
    }
}
