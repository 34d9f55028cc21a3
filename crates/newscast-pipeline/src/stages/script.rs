//! Script stage
//!
//! One batched LLM call turns the outline plus story details into
//! narratable sections with inline `[n]` citations against the enumerated
//! sources list.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use newscast_core::{
    ChatMessage, CompletionRequest, Error, Outline, OutlineSectionKind, Pick, Result, Script,
    ScriptSection, ScriptSectionKind, SourceEntry,
};
use newscast_llm::extract_json_object;

use crate::agent::{Agent, AgentContext};

/// Script stage input snapshot. `picks` carry the outline's ordering; the
/// sources list is numbered from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptInput {
    pub outline: Outline,
    pub picks: Vec<Pick>,
    pub word_target: u32,
    pub style: String,
}

impl ScriptInput {
    /// The numbered sources list (1..N) in pick order.
    pub fn sources(&self) -> Vec<SourceEntry> {
        self.picks
            .iter()
            .enumerate()
            .map(|(index, pick)| SourceEntry {
                number: index as u32 + 1,
                title: pick.story.title.clone(),
                url: pick.story.url.clone(),
            })
            .collect()
    }
}

/// Script stage agent.
pub struct ScriptAgent;

#[async_trait]
impl Agent for ScriptAgent {
    type Input = ScriptInput;
    type Output = Script;

    fn name(&self) -> &'static str {
        "ScriptAgent"
    }

    async fn process(&self, ctx: &AgentContext, input: &ScriptInput) -> Result<Script> {
        let sources = input.sources();
        let prompt = build_prompt(input, &sources);
        let completion = ctx
            .complete(
                CompletionRequest::new(vec![
                    ChatMessage::system(SYSTEM_PROMPT),
                    ChatMessage::user(prompt),
                ])
                .json(),
            )
            .await?;
        let wire: WireScript = extract_json_object(&completion.text)?;

        let mut sections: Vec<ScriptSection> = Vec::new();
        for wire_section in wire.sections.unwrap_or_default().into_iter().flatten() {
            let Some(text) = wire_section.text.filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            let citations = extract_citations(&text, sources.len() as u32);
            sections.push(ScriptSection {
                kind: parse_kind(wire_section.kind.as_deref()),
                text,
                citations,
            });
        }
        if sections.is_empty() {
            return Err(Error::Parse("script reply had no usable sections".into()));
        }

        let word_count = Script::count_words(&sections);
        Ok(Script {
            sections,
            sources,
            word_count,
        })
    }
}

const SYSTEM_PROMPT: &str = "You are the scriptwriter of a daily audio news briefing. \
Write flowing narration a single host can read aloud, citing sources inline as [n]. \
Respond with a single JSON object and nothing else.";

fn build_prompt(input: &ScriptInput, sources: &[SourceEntry]) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Write the full script for today's episode. Style: {}. Target length: about {} words.\n\n\
         Opening hook to work into the intro: {}\n\nOutline:\n",
        input.style, input.word_target, input.outline.opening_hook
    ));
    for section in &input.outline.sections {
        match section.kind {
            OutlineSectionKind::Intro => {
                prompt.push_str(&format!("- intro: {} ({} words)\n", section.title, section.target_words));
            }
            OutlineSectionKind::Outro => {
                prompt.push_str(&format!("- outro: {} ({} words)\n", section.title, section.target_words));
            }
            OutlineSectionKind::Segment => {
                prompt.push_str(&format!(
                    "- segment: {} ({} words; bridge: {})\n",
                    section.title, section.target_words, section.bridge
                ));
                for story_id in &section.refs {
                    if let Some((number, pick)) = input
                        .picks
                        .iter()
                        .enumerate()
                        .find(|(_, p)| p.story.id == *story_id)
                        .map(|(i, p)| (i + 1, p))
                    {
                        prompt.push_str(&format!(
                            "    [{}] {} ({}, {}): {}\n",
                            number,
                            pick.story.title,
                            pick.topic,
                            pick.story.source,
                            pick.story.summary.as_deref().unwrap_or("no summary")
                        ));
                    }
                }
            }
        }
    }
    prompt.push_str("\nSources:\n");
    for source in sources {
        prompt.push_str(&format!("{}. {} - {}\n", source.number, source.title, source.url));
    }
    prompt.push_str(
        "\nReturn JSON: {\"sections\": [{\"type\": \"intro\"|\"segment\"|\"outro\", \
         \"text\": string, \"duration_estimate_sec\": number, \"word_count\": number}]}.\n\
         Cite every factual claim inline with its source number, e.g. [1].\n",
    );
    prompt
}

static CITATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("citation regex is valid"));

/// `[n]` citation numbers in `text`: deduplicated, ascending, and clamped
/// to the valid source range.
pub fn extract_citations(text: &str, source_count: u32) -> Vec<u32> {
    let mut numbers: Vec<u32> = CITATION_RE
        .captures_iter(text)
        .filter_map(|cap| cap[1].parse::<u32>().ok())
        .filter(|n| (1..=source_count).contains(n))
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    numbers
}

fn parse_kind(raw: Option<&str>) -> ScriptSectionKind {
    match raw.map(|r| r.to_lowercase().replace('-', "_")).as_deref() {
        Some("cold_open") => ScriptSectionKind::ColdOpen,
        Some("intro") => ScriptSectionKind::Intro,
        Some("deep_dive") => ScriptSectionKind::DeepDive,
        Some("sign_off") => ScriptSectionKind::SignOff,
        Some("outro") => ScriptSectionKind::Outro,
        Some("segment") | None => ScriptSectionKind::Segment,
        Some(_) => ScriptSectionKind::Other,
    }
}

#[derive(Debug, Deserialize)]
struct WireScript {
    sections: Option<Vec<Option<WireScriptSection>>>,
}

#[derive(Debug, Deserialize)]
struct WireScriptSection {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
    #[allow(dead_code)]
    duration_estimate_sec: Option<f64>,
    #[allow(dead_code)]
    word_count: Option<f64>,
}
