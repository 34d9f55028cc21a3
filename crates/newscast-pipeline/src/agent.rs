//! Agent runtime
//!
//! Every pipeline stage implements [`Agent`] and runs through
//! [`AgentRuntime::execute`], which adds retries with exponential backoff,
//! timing, error capture, the per-run LLM call counter, and envelope
//! persistence at `runs/<run_id>/agents/<AgentName>.json` - on failure as
//! well as success, so a failed run leaves its evidence behind.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use newscast_core::{
    Completion, CompletionRequest, Error, LanguageModel, ObjectStore, Result,
};

/// One pipeline stage: a typed `process` operation.
#[async_trait]
pub trait Agent: Send + Sync {
    type Input: Serialize + Send + Sync;
    type Output: Serialize + Send;

    /// Stage name; also the envelope filename.
    fn name(&self) -> &'static str;

    async fn process(&self, ctx: &AgentContext, input: &Self::Input) -> Result<Self::Output>;
}

/// Per-execution context handed to `process`.
pub struct AgentContext {
    pub run_id: String,
    pub store: Arc<dyn ObjectStore>,
    pub cancel: CancellationToken,
    llm: Arc<dyn LanguageModel>,
    api_calls: AtomicU32,
}

impl AgentContext {
    /// Run one LLM completion, counting it against this agent's envelope.
    /// Stages must use this instead of holding their own model handle so
    /// the api-call counter stays exact.
    pub async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        if self.cancel.is_cancelled() {
            return Err(Error::Fatal("run cancelled".into()));
        }
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.llm.complete(request).await
    }

    /// LLM calls made so far in this execution.
    pub fn api_calls(&self) -> u32 {
        self.api_calls.load(Ordering::Relaxed)
    }
}

/// The persisted execution record of one stage.
#[derive(Debug, Clone, Serialize)]
pub struct AgentEnvelope<'a, I: Serialize, O: Serialize> {
    pub agent: &'a str,
    pub run_id: &'a str,
    pub timestamp: DateTime<Utc>,
    pub input: &'a I,
    pub output: Option<&'a O>,
    pub errors: &'a [String],
    pub artifacts: &'a [String],
    pub duration_ms: u64,
    pub api_calls: u32,
}

/// Retry settings for `process`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_secs(1),
        }
    }
}

/// Executes agents and keeps the process-wide call table.
pub struct AgentRuntime {
    store: Arc<dyn ObjectStore>,
    llm: Arc<dyn LanguageModel>,
    retry: RetryPolicy,
    /// (run_id, agent) to LLM call count, for reporting.
    call_table: DashMap<(String, String), u32>,
}

impl AgentRuntime {
    pub fn new(store: Arc<dyn ObjectStore>, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            store,
            llm,
            retry: RetryPolicy::default(),
            call_table: DashMap::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Envelope key for a stage of a run.
    pub fn envelope_key(run_id: &str, agent: &str) -> String {
        format!("runs/{run_id}/agents/{agent}.json")
    }

    /// LLM calls per agent for a run, from the process-wide table.
    pub fn calls_for_run(&self, run_id: &str) -> Vec<(String, u32)> {
        let mut calls: Vec<(String, u32)> = self
            .call_table
            .iter()
            .filter(|entry| entry.key().0 == run_id)
            .map(|entry| (entry.key().1.clone(), *entry.value()))
            .collect();
        calls.sort();
        calls
    }

    /// Run one agent under the retry policy and persist its envelope.
    pub async fn execute<A: Agent>(
        &self,
        run_id: &str,
        agent: &A,
        input: A::Input,
        cancel: &CancellationToken,
    ) -> Result<A::Output> {
        let ctx = AgentContext {
            run_id: run_id.to_string(),
            store: self.store.clone(),
            cancel: cancel.clone(),
            llm: self.llm.clone(),
            api_calls: AtomicU32::new(0),
        };
        self.call_table
            .insert((run_id.to_string(), agent.name().to_string()), 0);

        tracing::info!(run_id, agent = agent.name(), "agent starting");
        let started = Instant::now();
        let mut errors: Vec<String> = Vec::new();
        let mut delay = self.retry.initial_delay;
        let mut result: Option<A::Output> = None;
        let mut last_err: Option<Error> = None;

        for attempt in 1..=self.retry.attempts {
            if attempt > 1 {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            match agent.process(&ctx, &input).await {
                Ok(output) => {
                    result = Some(output);
                    last_err = None;
                    break;
                }
                Err(err) => {
                    tracing::warn!(
                        run_id,
                        agent = agent.name(),
                        attempt,
                        error = %err,
                        "agent attempt failed"
                    );
                    errors.push(format!("attempt {attempt}: {err}"));
                    let retryable = err.is_retryable();
                    last_err = Some(err);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let api_calls = ctx.api_calls();
        self.call_table
            .insert((run_id.to_string(), agent.name().to_string()), api_calls);

        let envelope = AgentEnvelope {
            agent: agent.name(),
            run_id,
            timestamp: Utc::now(),
            input: &input,
            output: result.as_ref(),
            errors: &errors,
            artifacts: &[],
            duration_ms,
            api_calls,
        };
        self.persist_envelope(run_id, agent.name(), &envelope).await;

        match (result, last_err) {
            (Some(output), _) => {
                tracing::info!(
                    run_id,
                    agent = agent.name(),
                    duration_ms,
                    api_calls,
                    "agent complete"
                );
                Ok(output)
            }
            (None, Some(err)) => Err(err),
            (None, None) => Err(Error::Fatal(format!("{} produced no output", agent.name()))),
        }
    }

    /// Envelope persistence failures are logged, never escalated: losing an
    /// artifact must not fail an otherwise healthy stage.
    async fn persist_envelope<I: Serialize, O: Serialize>(
        &self,
        run_id: &str,
        agent: &str,
        envelope: &AgentEnvelope<'_, I, O>,
    ) {
        let key = Self::envelope_key(run_id, agent);
        let body = match serde_json::to_vec_pretty(envelope) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(run_id, agent, error = %err, "envelope serialization failed");
                return;
            }
        };
        if let Err(err) = self
            .store
            .put(&key, Bytes::from(body), "application/json")
            .await
        {
            tracing::error!(run_id, agent, error = %err, "envelope persistence failed");
        }
    }
}
