//! TTS planning stage
//!
//! Turns script sections into synthesis units: voice casting by section
//! type, tone-driven speed, stage-direction cleanup, pause markers mapped
//! to ellipses, and greedy sentence packing into chunks of at most
//! [`MAX_UNIT_CHARS`] characters.

use std::collections::BTreeMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use newscast_config::VoiceMap;
use newscast_core::{
    Error, Result, Script, ScriptSectionKind, SynthesisPlan, SynthesisUnit, VoiceRole,
    MAX_UNIT_CHARS,
};

use crate::agent::{Agent, AgentContext};

/// Spoken words per second at speed 1.0.
const WORDS_PER_SEC: f64 = 2.5;

/// TTS planning input snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsPlanInput {
    pub script: Script,
    pub voices: VoiceMap,
    /// Token to phonetic expansion, applied before chunking.
    pub glossary: BTreeMap<String, String>,
}

/// TTS planning agent.
pub struct TtsPlanAgent;

#[async_trait]
impl Agent for TtsPlanAgent {
    type Input = TtsPlanInput;
    type Output = SynthesisPlan;

    fn name(&self) -> &'static str {
        "TtsPlanAgent"
    }

    async fn process(&self, _ctx: &AgentContext, input: &TtsPlanInput) -> Result<SynthesisPlan> {
        let mut units = Vec::new();
        for section in &input.script.sections {
            let role = role_for(section.kind);
            let voice = match role {
                VoiceRole::Host => input.voices.host.clone(),
                VoiceRole::Analyst => input.voices.analyst.clone(),
                VoiceRole::Stinger => input.voices.stinger.clone(),
            };
            let speed = speed_for(section.kind, &section.text);
            let text = clean_text(&section.text, &input.glossary);
            if text.is_empty() {
                tracing::warn!(kind = section.kind.as_str(), "section cleaned to nothing");
                continue;
            }
            for chunk in chunk_text(&text) {
                let words = chunk.split_whitespace().count() as f64;
                units.push(SynthesisUnit {
                    id: Uuid::new_v4(),
                    role,
                    voice: voice.clone(),
                    duration_sec_estimate: words / (WORDS_PER_SEC * speed as f64),
                    text: chunk,
                    speed,
                });
            }
        }
        if units.is_empty() {
            return Err(Error::EmptyResult("synthesis plan is empty".into()));
        }
        Ok(SynthesisPlan { units })
    }
}

/// Voice casting by section type: bookends and sign-offs narrate as host,
/// deep dives as analyst, everything else as host.
pub fn role_for(kind: ScriptSectionKind) -> VoiceRole {
    match kind {
        ScriptSectionKind::Intro
        | ScriptSectionKind::Outro
        | ScriptSectionKind::ColdOpen
        | ScriptSectionKind::SignOff => VoiceRole::Host,
        ScriptSectionKind::DeepDive => VoiceRole::Analyst,
        _ => VoiceRole::Host,
    }
}

const EXCITING_WORDS: &[&str] = &["breakthrough", "surge", "record", "soars", "massive", "historic"];
const SERIOUS_WORDS: &[&str] = &["lawsuit", "investigation", "layoffs", "breach", "crisis", "recall", "fraud"];
const POSITIVE_WORDS: &[&str] = &["growth", "profit", "success", "launch", "partnership", "wins"];

/// Tone-driven speed. Deep dives slow down for analysis; serious news is
/// measured, exciting news runs at full pace. All values sit inside the
/// synthesizer's [0.85, 1.05] envelope.
pub fn speed_for(kind: ScriptSectionKind, text: &str) -> f32 {
    if kind == ScriptSectionKind::DeepDive {
        return 0.90;
    }
    let lower = text.to_lowercase();
    let hit = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if hit(SERIOUS_WORDS) {
        0.93
    } else if hit(EXCITING_WORDS) {
        1.00
    } else if hit(POSITIVE_WORDS) {
        0.97
    } else {
        0.95
    }
}

static PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)").expect("parenthetical regex is valid"));
static PAUSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[beat\s+\d+\s*ms\]|\[pause\]").expect("pause regex is valid"));

/// Strip parenthetical stage directions, map pause markers to ellipses,
/// apply the pronunciation glossary, and collapse whitespace.
pub fn clean_text(text: &str, glossary: &BTreeMap<String, String>) -> String {
    let without_directions = PARENTHETICAL_RE.replace_all(text, "");
    let with_pauses = PAUSE_RE.replace_all(&without_directions, "...");
    let mut cleaned = with_pauses.into_owned();
    for (token, phonetic) in glossary {
        if !token.is_empty() {
            cleaned = cleaned.replace(token.as_str(), phonetic);
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

static SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("sentence regex is valid"));

/// Split at sentence boundaries and pack greedily up to the unit budget.
/// A single over-long sentence is hard-split so every chunk stays within
/// bounds.
pub fn chunk_text(text: &str) -> Vec<String> {
    if text.chars().count() <= MAX_UNIT_CHARS {
        return vec![text.to_string()];
    }

    let mut sentences: Vec<String> = SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .collect();
    if sentences.is_empty() {
        sentences.push(text.to_string());
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    for sentence in sentences {
        let sentence = if sentence.chars().count() > MAX_UNIT_CHARS {
            hard_split(&sentence, &mut chunks);
            continue;
        } else {
            sentence
        };
        let needed = sentence.chars().count() + if current.is_empty() { 0 } else { 1 };
        if current.chars().count() + needed > MAX_UNIT_CHARS && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&sentence);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn hard_split(sentence: &str, chunks: &mut Vec<String>) {
    let chars: Vec<char> = sentence.chars().collect();
    for piece in chars.chunks(MAX_UNIT_CHARS) {
        chunks.push(piece.iter().collect());
    }
}
