//! Fact-check and safety stages
//!
//! Two successive batched LLM passes over the script. Replies align by
//! section index and are decoded leniently: a null or missing entry means
//! "leave the section as written". Fact-check skips intro and outro;
//! safety reads everything and aggregates a risk level.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use newscast_core::{
    ChatMessage, CompletionRequest, Result, RiskLevel, Script, ScriptSectionKind,
};
use newscast_llm::extract_json_object;

use crate::agent::{Agent, AgentContext};

/// Input to both review passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewInput {
    pub script: Script,
    /// When set, unverified rumors are flagged for revision.
    pub rumor_filter: bool,
}

/// Output of a review pass: the (possibly revised) script plus the edit
/// trail and the aggregate risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutput {
    pub script: Script,
    pub edits: Vec<String>,
    pub risk_level: RiskLevel,
}

/// Sections the fact-check pass reviews. Intro and outro carry no claims.
fn fact_checkable(kind: ScriptSectionKind) -> bool {
    !matches!(kind, ScriptSectionKind::Intro | ScriptSectionKind::Outro)
}

/// Fact-check stage agent.
pub struct FactCheckAgent;

#[async_trait]
impl Agent for FactCheckAgent {
    type Input = ReviewInput;
    type Output = ReviewOutput;

    fn name(&self) -> &'static str {
        "FactCheckAgent"
    }

    async fn process(&self, ctx: &AgentContext, input: &ReviewInput) -> Result<ReviewOutput> {
        let mut script = input.script.clone();
        let reviewed: Vec<usize> = script
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| fact_checkable(s.kind))
            .map(|(index, _)| index)
            .collect();
        if reviewed.is_empty() {
            return Ok(ReviewOutput {
                script,
                edits: vec![],
                risk_level: RiskLevel::Low,
            });
        }

        let mut prompt = String::from(
            "Fact-check each numbered section against its cited sources. \
             For every section return revised_text (null when no change is needed) \
             and the list of edits you made.\n",
        );
        if input.rumor_filter {
            prompt.push_str(
                "Treat unverified rumors and single-sourced speculation as errors: \
                 rewrite them as clearly attributed claims or remove them.\n",
            );
        }
        prompt.push_str("\nSources:\n");
        for source in &script.sources {
            prompt.push_str(&format!("{}. {} - {}\n", source.number, source.title, source.url));
        }
        prompt.push_str("\nSections:\n");
        for (position, index) in reviewed.iter().enumerate() {
            prompt.push_str(&format!("{}: {}\n", position, script.sections[*index].text));
        }
        prompt.push_str(
            "\nReturn JSON: {\"sections\": [{\"revised_text\": string|null, \
             \"edits\": [string]}]} aligned with the numbered sections.\n",
        );

        let completion = ctx
            .complete(
                CompletionRequest::new(vec![
                    ChatMessage::system(
                        "You are a meticulous news fact-checker. Respond with a single JSON \
                         object and nothing else.",
                    ),
                    ChatMessage::user(prompt),
                ])
                .json(),
            )
            .await?;
        let wire: WireReview = extract_json_object(&completion.text)?;

        let mut edits = Vec::new();
        apply_revisions(&mut script, &reviewed, wire, &mut edits);
        script.word_count = Script::count_words(&script.sections);

        Ok(ReviewOutput {
            script,
            edits,
            risk_level: RiskLevel::Low,
        })
    }
}

/// Safety stage agent.
pub struct SafetyAgent;

#[async_trait]
impl Agent for SafetyAgent {
    type Input = ReviewInput;
    type Output = ReviewOutput;

    fn name(&self) -> &'static str {
        "SafetyAgent"
    }

    async fn process(&self, ctx: &AgentContext, input: &ReviewInput) -> Result<ReviewOutput> {
        let mut script = input.script.clone();
        let reviewed: Vec<usize> = (0..script.sections.len()).collect();

        let mut prompt = String::from(
            "Review each numbered section of a news narration for safety: defamation risk, \
             medical or financial advice stated as instruction, graphic detail, and privacy \
             violations. For every section return revised_text (null when no change is \
             needed), the list of changes, and a risk_level of low, medium, or high.\n\
             \nSections:\n",
        );
        for (position, section) in script.sections.iter().enumerate() {
            prompt.push_str(&format!("{}: {}\n", position, section.text));
        }
        prompt.push_str(
            "\nReturn JSON: {\"sections\": [{\"revised_text\": string|null, \
             \"changes\": [string], \"risk_level\": \"low\"|\"medium\"|\"high\"}]} \
             aligned with the numbered sections.\n",
        );

        let completion = ctx
            .complete(
                CompletionRequest::new(vec![
                    ChatMessage::system(
                        "You are a broadcast standards reviewer. Respond with a single JSON \
                         object and nothing else.",
                    ),
                    ChatMessage::user(prompt),
                ])
                .json(),
            )
            .await?;
        let wire: WireReview = extract_json_object(&completion.text)?;

        let risk_level = wire
            .sections
            .as_deref()
            .unwrap_or_default()
            .iter()
            .flatten()
            .filter_map(|s| s.risk_level.as_deref().and_then(parse_risk))
            .max()
            .unwrap_or(RiskLevel::Low);
        if risk_level == RiskLevel::High {
            tracing::warn!("safety pass reported high risk content");
        }

        let mut edits = Vec::new();
        apply_revisions(&mut script, &reviewed, wire, &mut edits);
        script.word_count = Script::count_words(&script.sections);

        Ok(ReviewOutput {
            script,
            edits,
            risk_level,
        })
    }
}

/// Apply a wire reply to the reviewed section indices. Null entries, short
/// replies, and extra entries are all tolerated as identity.
fn apply_revisions(
    script: &mut Script,
    reviewed: &[usize],
    wire: WireReview,
    edits: &mut Vec<String>,
) {
    let entries = wire.sections.unwrap_or_default();
    for (position, entry) in entries.into_iter().enumerate() {
        let Some(section_index) = reviewed.get(position).copied() else {
            break;
        };
        let Some(entry) = entry else {
            continue;
        };
        if let Some(revised) = entry.revised_text.filter(|t| !t.trim().is_empty()) {
            let source_count = script.sources.len() as u32;
            let section = &mut script.sections[section_index];
            section.text = revised;
            section.citations =
                crate::stages::script::extract_citations(&section.text, source_count);
        }
        edits.extend(entry.edits.into_iter().flatten().flatten());
    }
}

fn parse_risk(raw: &str) -> Option<RiskLevel> {
    match raw.to_lowercase().as_str() {
        "low" => Some(RiskLevel::Low),
        "medium" => Some(RiskLevel::Medium),
        "high" => Some(RiskLevel::High),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct WireReview {
    sections: Option<Vec<Option<WireReviewSection>>>,
}

#[derive(Debug, Deserialize)]
struct WireReviewSection {
    revised_text: Option<String>,
    /// Fact-check calls them edits, safety calls them changes; some model
    /// replies use flags. All feed the same trail.
    #[serde(alias = "changes", alias = "flags")]
    edits: Option<Vec<Option<String>>>,
    risk_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use newscast_core::{ScriptSection, SourceEntry};

    fn script() -> Script {
        let sections = vec![
            ScriptSection {
                kind: ScriptSectionKind::Intro,
                text: "Good morning.".into(),
                citations: vec![],
            },
            ScriptSection {
                kind: ScriptSectionKind::Segment,
                text: "Acme shipped a chip [1].".into(),
                citations: vec![1],
            },
            ScriptSection {
                kind: ScriptSectionKind::Outro,
                text: "See you tomorrow.".into(),
                citations: vec![],
            },
        ];
        let word_count = Script::count_words(&sections);
        Script {
            sections,
            sources: vec![SourceEntry {
                number: 1,
                title: "Acme ships".into(),
                url: "https://reuters.com/acme".into(),
            }],
            word_count,
        }
    }

    #[test]
    fn fact_checkable_skips_bookends() {
        assert!(!fact_checkable(ScriptSectionKind::Intro));
        assert!(!fact_checkable(ScriptSectionKind::Outro));
        assert!(fact_checkable(ScriptSectionKind::Segment));
        assert!(fact_checkable(ScriptSectionKind::DeepDive));
    }

    #[test]
    fn revisions_apply_by_reviewed_index() {
        let mut script = script();
        // Fact-check reviews only the segment (script index 1).
        let reviewed = vec![1usize];
        let wire: WireReview = serde_json::from_str(
            r#"{"sections": [{"revised_text": "Acme delayed its chip [1].",
                              "edits": ["corrected ship date", null]}]}"#,
        )
        .unwrap();
        let mut edits = Vec::new();
        apply_revisions(&mut script, &reviewed, wire, &mut edits);
        assert_eq!(script.sections[1].text, "Acme delayed its chip [1].");
        assert_eq!(script.sections[0].text, "Good morning.");
        assert_eq!(edits, vec!["corrected ship date".to_string()]);
    }

    #[test]
    fn null_entries_are_identity() {
        let mut script = script();
        let reviewed = vec![0usize, 1, 2];
        let wire: WireReview =
            serde_json::from_str(r#"{"sections": [null, {"revised_text": null, "changes": []}]}"#)
                .unwrap();
        let before = script.sections.iter().map(|s| s.text.clone()).collect::<Vec<_>>();
        let mut edits = Vec::new();
        apply_revisions(&mut script, &reviewed, wire, &mut edits);
        let after = script.sections.iter().map(|s| s.text.clone()).collect::<Vec<_>>();
        assert_eq!(before, after);
        assert!(edits.is_empty());
    }

    #[test]
    fn risk_aggregates_as_max() {
        let wire: WireReview = serde_json::from_str(
            r#"{"sections": [
                {"revised_text": null, "risk_level": "low"},
                {"revised_text": null, "risk_level": "high"},
                {"revised_text": null, "risk_level": "medium"}
            ]}"#,
        )
        .unwrap();
        let max = wire
            .sections
            .as_deref()
            .unwrap_or_default()
            .iter()
            .flatten()
            .filter_map(|s| s.risk_level.as_deref().and_then(parse_risk))
            .max()
            .unwrap();
        assert_eq!(max, RiskLevel::High);
    }
}
