//! Narration script types

use serde::{Deserialize, Serialize};

/// Section tag carried through scriptwriting and used for voice casting.
///
/// The LLM is free to emit tags beyond the structural three; unrecognized
/// tags decode as [`ScriptSectionKind::Other`] and narrate in the host voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptSectionKind {
    ColdOpen,
    Intro,
    Segment,
    DeepDive,
    SignOff,
    Outro,
    #[serde(other)]
    Other,
}

impl ScriptSectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColdOpen => "cold_open",
            Self::Intro => "intro",
            Self::Segment => "segment",
            Self::DeepDive => "deep_dive",
            Self::SignOff => "sign_off",
            Self::Outro => "outro",
            Self::Other => "other",
        }
    }
}

/// One narratable section of the final script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSection {
    pub kind: ScriptSectionKind,
    /// Final narration text with inline `[n]` citations.
    pub text: String,
    /// Citation numbers extracted from the text, deduplicated, ascending.
    #[serde(default)]
    pub citations: Vec<u32>,
}

/// One entry of the numbered sources list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceEntry {
    /// 1-based citation number.
    pub number: u32,
    pub title: String,
    pub url: String,
}

/// The full narration script for one episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub sections: Vec<ScriptSection>,
    pub sources: Vec<SourceEntry>,
    /// Whitespace-tokenized word count over all section text.
    pub word_count: u32,
}

impl Script {
    /// Recompute the word count from the section texts.
    pub fn count_words(sections: &[ScriptSection]) -> u32 {
        sections
            .iter()
            .map(|s| s.text.split_whitespace().count() as u32)
            .sum()
    }

    /// All citation numbers used anywhere in the script.
    pub fn all_citations(&self) -> Vec<u32> {
        let mut numbers: Vec<u32> = self
            .sections
            .iter()
            .flat_map(|s| s.citations.iter().copied())
            .collect();
        numbers.sort_unstable();
        numbers.dedup();
        numbers
    }
}
