//! Core types and traits for the daily newscast pipeline
//!
//! This crate provides the foundational pieces shared by every other crate:
//! - Domain types (stories, picks, outlines, scripts, synthesis plans, manifests)
//! - The run lifecycle types (summaries, the persisted runs index)
//! - Source-tier classification for journalistic authority
//! - Provider traits for pluggable backends (LLM, embeddings, TTS, object store)
//! - The pipeline error taxonomy

pub mod error;
pub mod hash;
pub mod manifest;
pub mod outline;
pub mod run;
pub mod script;
pub mod story;
pub mod synthesis;
pub mod tier;
pub mod topic;
pub mod traits;

pub use error::{Error, Result};
pub use hash::sha256_hex;
pub use manifest::{
    EpisodeManifest, IngestionSummary, OutlineSummary, PipelineReport, RankingSummary,
    ReviewSummary, RiskLevel, ScriptSummary, StageTiming, TopicCount,
};
pub use outline::{ConnectionType, Outline, OutlineSection, OutlineSectionKind};
pub use run::{RunStatus, RunSummary, RunsIndex, RUNS_INDEX_CAP};
pub use script::{Script, ScriptSection, ScriptSectionKind, SourceEntry};
pub use story::{domain_of_url, normalize_domain, story_id, Pick, Story};
pub use synthesis::{SynthesisPlan, SynthesisUnit, VoiceRole, MAX_UNIT_CHARS};
pub use tier::SourceTier;
pub use topic::TopicConfig;
pub use traits::{
    ChatMessage, ChatRole, Completion, CompletionRequest, EmbeddingBackend, LanguageModel,
    ObjectStore, SpeechRequest, SpeechSynthesizer,
};
