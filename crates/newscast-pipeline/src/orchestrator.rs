//! Run orchestrator
//!
//! Drives one run through the fixed stage sequence: build config,
//! idempotency check, ingest, rank, outline, script, fact-check, safety,
//! TTS planning, audio, publish, memory. Stages run strictly in order; a
//! failure releases the guard, records the error, and returns partial
//! metrics. The date-level idempotency check makes re-triggering a built
//! day a cheap no-op unless a rebuild is forced.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use newscast_config::{ConfigStore, DashboardConfig};
use newscast_core::{
    sha256_hex, EmbeddingBackend, EpisodeManifest, Error, IngestionSummary, LanguageModel,
    ObjectStore, Outline, OutlineSummary, PipelineReport, RankingSummary, Result, ReviewSummary,
    Script, ScriptSummary, SpeechSynthesizer, StageTiming,
};
use newscast_ingest::{FeedFetcher, IngestionOutput, Ingestor};
use newscast_rank::{RankOutput, Ranker};

use crate::agent::AgentRuntime;
use crate::progress::{Phase, ProgressTracker, UpdateStatus};
use crate::runs::RunRegistry;
use crate::stages::{
    AudioAgent, AudioInput, FactCheckAgent, IngestAgent, IngestInput, MemoryAgent, MemoryInput,
    OutlineAgent, OutlineInput, PublishAgent, PublishInput, RankAgent, RankInput, ReviewInput,
    ReviewOutput, SafetyAgent, ScriptAgent, ScriptInput, TtsPlanAgent, TtsPlanInput,
};

/// Seconds of episode per selected story, before clamping to the
/// configured story-count bounds.
const SEC_PER_STORY: u32 = 120;

/// Trigger parameters for one run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunRequest {
    /// Episode date `YYYY-MM-DD`; today in the configured timezone when
    /// absent.
    pub date: Option<String>,
    pub force_overwrite: Option<bool>,
    pub window_hours: Option<u32>,
}

/// Result of one orchestrated run, success or not.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub success: bool,
    pub run_id: String,
    /// True when the idempotency check returned an existing episode.
    pub reused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<EpisodeManifest>,
    pub timings: Vec<StageTiming>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunOutcome {
    fn failure(run_id: String, timings: Vec<StageTiming>, error: String) -> Self {
        Self {
            success: false,
            run_id,
            reused: false,
            manifest: None,
            timings,
            error: Some(error),
        }
    }
}

/// The pipeline coordinator. One per process.
pub struct Orchestrator {
    store: Arc<dyn ObjectStore>,
    config_store: ConfigStore,
    registry: Arc<RunRegistry>,
    progress: Arc<ProgressTracker>,
    runtime: AgentRuntime,
    ingest_agent: IngestAgent,
    rank_agent: RankAgent,
    audio_agent: AudioAgent,
    /// Default for `force_overwrite` when the trigger omits it.
    default_force: bool,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        config_store: ConfigStore,
        registry: Arc<RunRegistry>,
        progress: Arc<ProgressTracker>,
        llm: Arc<dyn LanguageModel>,
        embeddings: Arc<dyn EmbeddingBackend>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        fetcher: Arc<dyn FeedFetcher>,
        default_force: bool,
    ) -> Self {
        Self {
            runtime: AgentRuntime::new(store.clone(), llm),
            ingest_agent: IngestAgent::new(Arc::new(Ingestor::new(fetcher))),
            rank_agent: RankAgent::new(Arc::new(Ranker::new(embeddings))),
            audio_agent: AudioAgent::new(synthesizer),
            store,
            config_store,
            registry,
            progress,
            default_force,
        }
    }

    /// LLM calls per agent for a run, for the metrics payload.
    pub fn llm_calls(&self, run_id: &str) -> Vec<(String, u32)> {
        self.runtime.calls_for_run(run_id)
    }

    /// Execute one run to completion (or failure). Never panics; every
    /// outcome carries the stage timings gathered so far.
    pub async fn run(&self, request: RunRequest) -> RunOutcome {
        // BUILD_CONFIG
        let cfg = self.config_store.load().await;
        let run_id = match resolve_date(&request, &cfg) {
            Ok(date) => date,
            Err(err) => return RunOutcome::failure(String::new(), vec![], err.to_string()),
        };
        let enabled_topics: Vec<_> = cfg.enabled_topics().into_iter().cloned().collect();
        if enabled_topics.is_empty() {
            return RunOutcome::failure(
                run_id,
                vec![],
                Error::Validation("no enabled topics in dashboard config".into()).to_string(),
            );
        }
        let window_hours = request.window_hours.unwrap_or(cfg.window_hours).max(1);
        let force = request.force_overwrite.unwrap_or(self.default_force);

        // IDEMPOTENCY_CHECK
        if !force {
            if let Some(existing) = self.existing_episode(&run_id).await {
                tracing::info!(run_id = %run_id, "episode already built, returning manifest");
                return RunOutcome {
                    success: true,
                    run_id,
                    reused: true,
                    manifest: Some(existing),
                    timings: vec![],
                    error: None,
                };
            }
        }

        if !self.registry.start_run(&run_id, &run_id).await {
            return RunOutcome::failure(
                run_id,
                vec![],
                "another run is already active".to_string(),
            );
        }

        let cancel = CancellationToken::new();
        let mut timings: Vec<StageTiming> = Vec::new();
        self.progress.add_update(
            &run_id,
            Phase::Starting,
            UpdateStatus::Started,
            format!("run started for {run_id}"),
            None,
        );

        match self
            .drive(&run_id, &cfg, &enabled_topics, window_hours, &cancel, &mut timings)
            .await
        {
            Ok(manifest) => {
                self.registry.complete_run(&run_id, &manifest).await;
                self.progress.add_update(
                    &run_id,
                    Phase::Complete,
                    UpdateStatus::Completed,
                    format!("episode published: {}", manifest.mp3_url),
                    None,
                );
                RunOutcome {
                    success: true,
                    run_id,
                    reused: false,
                    manifest: Some(manifest),
                    timings,
                    error: None,
                }
            }
            Err((phase, err)) => {
                cancel.cancel();
                tracing::error!(run_id = %run_id, phase = phase.as_str(), error = %err, "run failed");
                self.progress.add_update(
                    &run_id,
                    phase,
                    UpdateStatus::Failed,
                    err.to_string(),
                    None,
                );
                self.registry.fail_run(&run_id, &err.to_string()).await;
                RunOutcome::failure(run_id, timings, err.to_string())
            }
        }
    }

    /// The INGEST..MEMORY stage chain. Returns the final manifest, or the
    /// failing phase and error.
    async fn drive(
        &self,
        run_id: &str,
        cfg: &DashboardConfig,
        enabled_topics: &[newscast_core::TopicConfig],
        window_hours: u32,
        cancel: &CancellationToken,
        timings: &mut Vec<StageTiming>,
    ) -> std::result::Result<EpisodeManifest, (Phase, Error)> {
        // INGEST
        let ingest_input = IngestInput {
            topics: enabled_topics.to_vec(),
            cutoff: Utc::now() - Duration::hours(window_hours as i64),
            window_hours,
            min_content_length: cfg.min_content_length,
            max_stories_per_domain: cfg.max_stories_per_domain,
            banned_domains: cfg.banned_domains.clone(),
        };
        self.phase_started(run_id, Phase::Ingestion, "fetching feeds");
        let ingested: IngestionOutput = self
            .timed(run_id, Phase::Ingestion, "ingestion", timings, &self.ingest_agent, ingest_input, cancel)
            .await?;
        self.progress.add_update(
            run_id,
            Phase::Ingestion,
            UpdateStatus::Completed,
            format!("{} stories accepted", ingested.stories.len()),
            None,
        );

        // RANK
        let target_count = (cfg.target_duration_sec / SEC_PER_STORY)
            .clamp(cfg.production.min_stories, cfg.production.max_stories)
            as usize;
        let rank_input = RankInput {
            stories: ingested.stories.clone(),
            topics: enabled_topics.to_vec(),
            target_count,
        };
        self.phase_started(run_id, Phase::Ranking, "scoring stories");
        let ranked: RankOutput = self
            .timed(run_id, Phase::Ranking, "ranking", timings, &self.rank_agent, rank_input, cancel)
            .await?;
        if ranked.picks.is_empty() {
            return Err((
                Phase::Ranking,
                Error::EmptyResult("ranking selected no stories".into()),
            ));
        }
        self.progress.add_update(
            run_id,
            Phase::Ranking,
            UpdateStatus::Completed,
            format!("{} stories selected", ranked.picks.len()),
            None,
        );

        // OUTLINE
        let outline_input = OutlineInput {
            picks: ranked.picks.clone(),
            topic_weights: cfg.topic_weights(),
            target_duration_sec: cfg.target_duration_sec,
            production: cfg.production.clone(),
        };
        let ordered_picks: Vec<_> = outline_input
            .sorted_picks()
            .into_iter()
            .cloned()
            .collect();
        let word_target = outline_input.word_target();
        self.phase_started(run_id, Phase::Outline, "structuring the episode");
        let outline: Outline = self
            .timed(run_id, Phase::Outline, "outline", timings, &OutlineAgent, outline_input, cancel)
            .await?;
        self.progress.add_update(
            run_id,
            Phase::Outline,
            UpdateStatus::Completed,
            format!("{} segments planned", outline.segment_count()),
            None,
        );

        // SCRIPT
        let script_input = ScriptInput {
            outline: outline.clone(),
            picks: ordered_picks.clone(),
            word_target,
            style: cfg.production.style.clone(),
        };
        self.phase_started(run_id, Phase::Scriptwriting, "writing narration");
        let script: Script = self
            .timed(run_id, Phase::Scriptwriting, "script", timings, &ScriptAgent, script_input, cancel)
            .await?;
        self.progress.add_update(
            run_id,
            Phase::Scriptwriting,
            UpdateStatus::Completed,
            format!("{} words drafted", script.word_count),
            None,
        );

        // FACTCHECK
        self.phase_started(run_id, Phase::FactCheck, "fact-checking");
        let fact: ReviewOutput = self
            .timed(
                run_id,
                Phase::FactCheck,
                "fact_check",
                timings,
                &FactCheckAgent,
                ReviewInput {
                    script,
                    rumor_filter: cfg.rumor_filter,
                },
                cancel,
            )
            .await?;
        self.progress.add_update(
            run_id,
            Phase::FactCheck,
            UpdateStatus::Completed,
            format!("{} edits", fact.edits.len()),
            None,
        );

        // SAFETY
        self.phase_started(run_id, Phase::Safety, "safety review");
        let safety: ReviewOutput = self
            .timed(
                run_id,
                Phase::Safety,
                "safety",
                timings,
                &SafetyAgent,
                ReviewInput {
                    script: fact.script.clone(),
                    rumor_filter: cfg.rumor_filter,
                },
                cancel,
            )
            .await?;
        self.progress.add_update(
            run_id,
            Phase::Safety,
            UpdateStatus::Completed,
            format!("risk level {}", safety.risk_level.as_str()),
            None,
        );

        // TTS_PLAN
        self.phase_started(run_id, Phase::Tts, "planning synthesis");
        let plan = self
            .timed(
                run_id,
                Phase::Tts,
                "tts_plan",
                timings,
                &TtsPlanAgent,
                TtsPlanInput {
                    script: safety.script.clone(),
                    voices: cfg.voices.clone(),
                    glossary: cfg.pronunciation_glossary.clone(),
                },
                cancel,
            )
            .await?;
        self.progress.add_update(
            run_id,
            Phase::Tts,
            UpdateStatus::Completed,
            format!("{} synthesis units", plan.units.len()),
            None,
        );

        // AUDIO
        self.phase_started(run_id, Phase::Audio, "synthesizing audio");
        let audio = self
            .timed(
                run_id,
                Phase::Audio,
                "audio",
                timings,
                &self.audio_agent,
                AudioInput {
                    plan,
                    intro_music_key: cfg.production.intro_music_key.clone(),
                    outro_music_key: cfg.production.outro_music_key.clone(),
                },
                cancel,
            )
            .await?;
        self.progress.add_update(
            run_id,
            Phase::Audio,
            UpdateStatus::Completed,
            format!("{:.0}s of audio", audio.duration_sec),
            None,
        );

        // PUBLISH
        let report = compile_report(&ingested, &ranked, &outline, &safety.script, &fact, &safety);
        let manifest_draft = EpisodeManifest {
            date: run_id.to_string(),
            run_id: run_id.to_string(),
            generated_at: Utc::now(),
            picks: ranked.picks.clone(),
            outline_hash: json_hash(&outline),
            script_hash: json_hash(&safety.script),
            audio_hash: sha256_hex(&audio.audio),
            mp3_url: String::new(),
            mp3_bytes: 0,
            duration_sec: audio.duration_sec,
            word_count: safety.script.word_count,
            timings: timings.clone(),
            pipeline_report: report,
        };
        self.phase_started(run_id, Phase::Publishing, "publishing episode");
        let published = self
            .timed(
                run_id,
                Phase::Publishing,
                "publish",
                timings,
                &PublishAgent,
                PublishInput {
                    manifest: manifest_draft,
                    podcast: cfg.podcast.clone(),
                    audio: audio.audio.clone(),
                },
                cancel,
            )
            .await?;

        // MEMORY: best-effort, never fails the run.
        let memory_input = MemoryInput {
            date: run_id.to_string(),
            pick_topics: ranked.picks.iter().map(|p| p.topic.clone()).collect(),
        };
        if let Err(err) = self
            .runtime
            .execute(run_id, &MemoryAgent, memory_input, cancel)
            .await
        {
            tracing::warn!(run_id, error = %err, "memory hook failed");
        }

        Ok(published.manifest)
    }

    fn phase_started(&self, run_id: &str, phase: Phase, message: &str) {
        self.progress
            .add_update(run_id, phase, UpdateStatus::Started, message, None);
    }

    /// Execute one agent with wall-clock timing, tagging failures with the
    /// phase for progress reporting.
    async fn timed<A: crate::agent::Agent>(
        &self,
        run_id: &str,
        phase: Phase,
        stage: &str,
        timings: &mut Vec<StageTiming>,
        agent: &A,
        input: A::Input,
        cancel: &CancellationToken,
    ) -> std::result::Result<A::Output, (Phase, Error)> {
        let started = Instant::now();
        let result = self.runtime.execute(run_id, agent, input, cancel).await;
        timings.push(StageTiming {
            stage: stage.to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
        result.map_err(|err| (phase, err))
    }

    /// Idempotency check: the episode exists when its mp3 does and its
    /// manifest loads.
    async fn existing_episode(&self, run_id: &str) -> Option<EpisodeManifest> {
        let mp3_exists = self
            .store
            .exists(&EpisodeManifest::mp3_key(run_id))
            .await
            .unwrap_or(false);
        if !mp3_exists {
            return None;
        }
        match self.registry.get_manifest(run_id).await {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                tracing::warn!(run_id, error = %err, "episode exists but manifest is unreadable");
                None
            }
        }
    }
}

/// Resolve the episode date: the requested one (validated) or today in the
/// configured timezone.
fn resolve_date(request: &RunRequest, cfg: &DashboardConfig) -> Result<String> {
    if let Some(date) = &request.date {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| Error::Validation(format!("invalid date: {date}")))?;
        return Ok(date.clone());
    }
    let tz: chrono_tz::Tz = cfg
        .timezone
        .parse()
        .map_err(|_| Error::Validation(format!("unknown timezone: {}", cfg.timezone)))?;
    Ok(Utc::now().with_timezone(&tz).format("%Y-%m-%d").to_string())
}

fn json_hash<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_vec(value) {
        Ok(body) => sha256_hex(&body),
        Err(_) => String::new(),
    }
}

/// Aggregate the stage outputs into the manifest's pipeline report.
fn compile_report(
    ingested: &IngestionOutput,
    ranked: &RankOutput,
    outline: &Outline,
    script: &Script,
    fact: &ReviewOutput,
    safety: &ReviewOutput,
) -> PipelineReport {
    PipelineReport {
        ingestion: IngestionSummary {
            sources_scanned: ingested.report.sources.len() as u32,
            items_seen: ingested.report.total_items,
            stories_accepted: ingested.report.accepted_count(),
            stories_filtered: ingested.report.filtered.len() as u32,
            topics: ingested.report.topics.clone(),
        },
        ranking: RankingSummary {
            candidates: ingested.stories.len() as u32,
            selected: ranked.picks.len() as u32,
            distribution: ranked.distribution.clone(),
            top_picks: ranked
                .picks
                .iter()
                .map(|p| p.story.title.clone())
                .collect(),
            rejections: ranked.report.rejections.clone(),
        },
        outline: OutlineSummary {
            segments: outline.segment_count() as u32,
            opening_hook: outline.opening_hook.clone(),
            section_titles: outline.sections.iter().map(|s| s.title.clone()).collect(),
        },
        script: ScriptSummary {
            sections: script.sections.len() as u32,
            word_count: script.word_count,
            sources: script.sources.len() as u32,
        },
        review: ReviewSummary {
            fact_check_edits: fact.edits.clone(),
            safety_edits: safety.edits.clone(),
            risk_level: safety.risk_level,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_date_must_be_iso() {
        let cfg = DashboardConfig::from_env();
        let request = RunRequest {
            date: Some("08/01/2026".into()),
            ..Default::default()
        };
        assert!(resolve_date(&request, &cfg).is_err());

        let request = RunRequest {
            date: Some("2026-08-01".into()),
            ..Default::default()
        };
        assert_eq!(resolve_date(&request, &cfg).unwrap(), "2026-08-01");
    }

    #[test]
    fn default_date_uses_configured_timezone() {
        let cfg = DashboardConfig::from_env();
        let resolved = resolve_date(&RunRequest::default(), &cfg).unwrap();
        assert_eq!(resolved.len(), 10);
        assert!(NaiveDate::parse_from_str(&resolved, "%Y-%m-%d").is_ok());
    }
}
