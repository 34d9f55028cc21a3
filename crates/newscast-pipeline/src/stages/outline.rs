//! Outline stage
//!
//! One LLM pass that turns the ranked picks into a thematic segment plan.
//! The reply is decoded defensively: null sections are dropped, invalid
//! story indices are filtered, unreferenced stories are folded into the
//! last segment, and missing intro/outro sections are synthesized.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use newscast_config::ProductionTuning;
use newscast_core::{
    ChatMessage, CompletionRequest, ConnectionType, Error, Outline, OutlineSection,
    OutlineSectionKind, Pick, Result,
};
use newscast_llm::extract_json_object;

use crate::agent::{Agent, AgentContext};

/// Spoken words per second of narration.
const WORDS_PER_SEC: f64 = 2.5;

/// Upper bound on thematic segments the model may plan.
const MAX_SEGMENTS: usize = 4;

/// Outline stage input snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineInput {
    pub picks: Vec<Pick>,
    /// Lower-cased topic label to weight, for pick ordering.
    pub topic_weights: BTreeMap<String, f64>,
    pub target_duration_sec: u32,
    pub production: ProductionTuning,
}

impl OutlineInput {
    /// Picks sorted by topic weight descending, then score descending.
    /// Stable, so equal keys keep ranking order.
    pub fn sorted_picks(&self) -> Vec<&Pick> {
        let mut picks: Vec<&Pick> = self.picks.iter().collect();
        picks.sort_by(|a, b| {
            let wa = self
                .topic_weights
                .get(&a.topic.to_lowercase())
                .copied()
                .unwrap_or(0.0);
            let wb = self
                .topic_weights
                .get(&b.topic.to_lowercase())
                .copied()
                .unwrap_or(0.0);
            wb.partial_cmp(&wa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });
        picks
    }

    /// Narration word budget: target duration minus the estimated pause
    /// budget, at spoken pace. Pauses: one long beat around each segment
    /// boundary, two short beats per story.
    pub fn word_target(&self) -> u32 {
        let long_pauses = (MAX_SEGMENTS as u64 + 1) * self.production.pause_long_ms as u64;
        let short_pauses = 2 * self.picks.len() as u64 * self.production.pause_short_ms as u64;
        let pause_sec = (long_pauses + short_pauses) as f64 / 1000.0;
        let effective = (self.target_duration_sec as f64 - pause_sec).max(60.0);
        (effective * WORDS_PER_SEC) as u32
    }
}

/// Outline stage agent.
pub struct OutlineAgent;

#[async_trait]
impl Agent for OutlineAgent {
    type Input = OutlineInput;
    type Output = Outline;

    fn name(&self) -> &'static str {
        "OutlineAgent"
    }

    async fn process(&self, ctx: &AgentContext, input: &OutlineInput) -> Result<Outline> {
        if input.picks.is_empty() {
            return Err(Error::EmptyResult("no picks to outline".into()));
        }
        let sorted = input.sorted_picks();
        let prompt = build_prompt(&sorted, input);
        let completion = ctx
            .complete(
                CompletionRequest::new(vec![
                    ChatMessage::system(SYSTEM_PROMPT),
                    ChatMessage::user(prompt),
                ])
                .json(),
            )
            .await?;
        let wire: WireOutline = extract_json_object(&completion.text)?;
        let outline = assemble(wire, &sorted, input.word_target());
        if outline.segment_count() == 0 {
            return Err(Error::Parse("outline reply had no usable segments".into()));
        }
        Ok(outline)
    }
}

const SYSTEM_PROMPT: &str = "You are the senior editor of a daily audio news briefing. \
Group today's stories into a tight thematic rundown a narrator can read aloud. \
Respond with a single JSON object and nothing else.";

fn build_prompt(sorted: &[&Pick], input: &OutlineInput) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Plan today's episode from the {} stories below. Style: {}.\n\
         Total narration budget: about {} words.\n\n",
        sorted.len(),
        input.production.style,
        input.word_target()
    ));
    for (index, pick) in sorted.iter().enumerate() {
        prompt.push_str(&format!(
            "Story {index}: [{}] {} ({}): {}\n",
            pick.topic,
            pick.story.title,
            pick.story.source,
            pick.story.summary.as_deref().unwrap_or("no summary")
        ));
    }
    prompt.push_str(&format!(
        "\nReturn JSON: {{\"opening_hook\": string, \"sections\": [...]}}.\n\
         Rules:\n\
         - opening_hook: one surprising, concrete lead sentence for the intro.\n\
         - sections: an intro, 2-{MAX_SEGMENTS} thematic segments, and an outro, in order.\n\
         - Each section: {{\"type\": \"intro\"|\"segment\"|\"outro\", \"title\": string, \
         \"target_words\": number, \"refs\": [story indices], \
         \"connection_type\": \"cause_effect\"|\"common_theme\"|\"contrast\"|\"timeline\"|\"industry_impact\", \
         \"bridge\": string}}.\n\
         - refs are zero-based indices into the story list above; every story \
         must appear in at least one segment.\n\
         - bridge: one sentence on how the segment's stories relate.\n\
         - Split target_words across sections to hit the total budget.\n"
    ));
    prompt
}

/// Build the final outline from the wire reply, defensively.
fn assemble(wire: WireOutline, sorted: &[&Pick], word_target: u32) -> Outline {
    let mut sections: Vec<OutlineSection> = Vec::new();
    let mut referenced = vec![false; sorted.len()];

    for wire_section in wire.sections.unwrap_or_default().into_iter().flatten() {
        let kind = match wire_section.kind.as_deref() {
            Some("intro") => OutlineSectionKind::Intro,
            Some("outro") => OutlineSectionKind::Outro,
            _ => OutlineSectionKind::Segment,
        };
        let refs: Vec<String> = wire_section
            .refs
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|index| {
                let index = usize::try_from(index).ok()?;
                let pick = sorted.get(index)?;
                referenced[index] = true;
                Some(pick.story.id.clone())
            })
            .collect();
        if kind == OutlineSectionKind::Segment && refs.is_empty() {
            tracing::warn!("dropping outline segment without valid refs");
            continue;
        }
        sections.push(OutlineSection {
            kind,
            title: wire_section.title.unwrap_or_else(|| "Segment".to_string()),
            target_words: wire_section.target_words.map(|w| w as u32).unwrap_or(0),
            refs,
            connection: wire_section
                .connection_type
                .as_deref()
                .and_then(parse_connection),
            bridge: wire_section.bridge.unwrap_or_default(),
        });
    }

    // Every pick must land somewhere; strays join the last segment.
    let strays: Vec<String> = referenced
        .iter()
        .enumerate()
        .filter(|(_, seen)| !**seen)
        .map(|(index, _)| sorted[index].story.id.clone())
        .collect();
    if !strays.is_empty() {
        tracing::warn!(count = strays.len(), "outline left stories unreferenced");
        if let Some(last_segment) = sections
            .iter_mut()
            .rev()
            .find(|s| s.kind == OutlineSectionKind::Segment)
        {
            last_segment.refs.extend(strays);
        } else {
            sections.push(OutlineSection {
                kind: OutlineSectionKind::Segment,
                title: "Also today".to_string(),
                target_words: word_target / 4,
                refs: strays,
                connection: Some(ConnectionType::CommonTheme),
                bridge: "A quick sweep of the remaining stories.".to_string(),
            });
        }
    }

    // Mandatory bookends.
    if !sections
        .iter()
        .any(|s| s.kind == OutlineSectionKind::Intro)
    {
        sections.insert(
            0,
            OutlineSection {
                kind: OutlineSectionKind::Intro,
                title: "Welcome".to_string(),
                target_words: word_target / 12,
                refs: vec![],
                connection: None,
                bridge: String::new(),
            },
        );
    }
    if !sections
        .iter()
        .any(|s| s.kind == OutlineSectionKind::Outro)
    {
        sections.push(OutlineSection {
            kind: OutlineSectionKind::Outro,
            title: "Sign-off".to_string(),
            target_words: word_target / 12,
            refs: vec![],
            connection: None,
            bridge: String::new(),
        });
    }

    Outline {
        opening_hook: wire.opening_hook.unwrap_or_default(),
        sections,
    }
}

fn parse_connection(raw: &str) -> Option<ConnectionType> {
    match raw.to_lowercase().replace('-', "_").as_str() {
        "cause_effect" => Some(ConnectionType::CauseEffect),
        "common_theme" => Some(ConnectionType::CommonTheme),
        "contrast" => Some(ConnectionType::Contrast),
        "timeline" => Some(ConnectionType::Timeline),
        "industry_impact" => Some(ConnectionType::IndustryImpact),
        other => {
            tracing::debug!(connection = other, "unknown connection type");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireOutline {
    opening_hook: Option<String>,
    sections: Option<Vec<Option<WireSection>>>,
}

#[derive(Debug, Deserialize)]
struct WireSection {
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    target_words: Option<f64>,
    refs: Option<Vec<Option<i64>>>,
    connection_type: Option<String>,
    bridge: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use newscast_core::Story;

    fn pick(url: &str, title: &str, topic: &str, score: f64) -> Pick {
        Pick {
            story: Story::new(
                format!("https://reuters.com/{url}"),
                title,
                "Reuters",
                Utc::now(),
                topic,
            ),
            topic: topic.to_string(),
            score,
            rationale: String::new(),
        }
    }

    fn input(picks: Vec<Pick>) -> OutlineInput {
        let mut topic_weights = BTreeMap::new();
        topic_weights.insert("ai".to_string(), 0.6);
        topic_weights.insert("vz".to_string(), 0.4);
        OutlineInput {
            picks,
            topic_weights,
            target_duration_sec: 900,
            production: ProductionTuning::default(),
        }
    }

    #[test]
    fn picks_sort_by_weight_then_score() {
        let input = input(vec![
            pick("v", "vz high", "VZ", 0.9),
            pick("a1", "ai low", "AI", 0.2),
            pick("a2", "ai high", "AI", 0.8),
        ]);
        let sorted = input.sorted_picks();
        let titles: Vec<&str> = sorted.iter().map(|p| p.story.title.as_str()).collect();
        assert_eq!(titles, ["ai high", "ai low", "vz high"]);
    }

    #[test]
    fn word_target_deducts_pause_budget() {
        let input = input(vec![pick("a", "a", "AI", 1.0)]);
        // 5 long pauses of 700ms + 2 short of 300ms = 4.1s deducted.
        let expected = ((900.0 - 4.1) * 2.5) as u32;
        assert_eq!(input.word_target(), expected);
    }

    #[test]
    fn assemble_remaps_refs_and_folds_strays() {
        let picks = vec![
            pick("a", "first", "AI", 0.9),
            pick("b", "second", "AI", 0.8),
            pick("c", "third", "VZ", 0.7),
        ];
        let input = input(picks);
        let sorted = input.sorted_picks();
        let wire = WireOutline {
            opening_hook: Some("Hook.".to_string()),
            sections: Some(vec![
                Some(WireSection {
                    kind: Some("intro".to_string()),
                    title: Some("Welcome".to_string()),
                    target_words: Some(80.0),
                    refs: None,
                    connection_type: None,
                    bridge: None,
                }),
                None, // model emitted a null entry
                Some(WireSection {
                    kind: Some("segment".to_string()),
                    title: Some("AI moves".to_string()),
                    target_words: Some(400.0),
                    // index 9 is invalid and dropped; story 2 goes missing.
                    refs: Some(vec![Some(0), Some(1), Some(9), None]),
                    connection_type: Some("common-theme".to_string()),
                    bridge: Some("Both chase compute.".to_string()),
                }),
                Some(WireSection {
                    kind: Some("outro".to_string()),
                    title: Some("Sign-off".to_string()),
                    target_words: Some(60.0),
                    refs: None,
                    connection_type: None,
                    bridge: None,
                }),
            ]),
        };
        let outline = assemble(wire, &sorted, 2000);

        assert_eq!(outline.opening_hook, "Hook.");
        assert_eq!(outline.sections.len(), 3);
        let segment = &outline.sections[1];
        assert_eq!(segment.kind, OutlineSectionKind::Segment);
        assert_eq!(segment.connection, Some(ConnectionType::CommonTheme));
        // The two valid refs plus the stray third story.
        assert_eq!(segment.refs.len(), 3);
        let all_ids = outline.referenced_ids();
        for pick in &input.picks {
            assert!(all_ids.contains(&pick.story.id));
        }
    }

    #[test]
    fn assemble_synthesizes_missing_bookends() {
        let picks = vec![pick("a", "only", "AI", 0.9)];
        let input = input(picks);
        let sorted = input.sorted_picks();
        let wire = WireOutline {
            opening_hook: None,
            sections: Some(vec![Some(WireSection {
                kind: Some("segment".to_string()),
                title: Some("One story".to_string()),
                target_words: Some(300.0),
                refs: Some(vec![Some(0)]),
                connection_type: None,
                bridge: Some("Just one.".to_string()),
            })]),
        };
        let outline = assemble(wire, &sorted, 1200);
        assert_eq!(outline.sections[0].kind, OutlineSectionKind::Intro);
        assert_eq!(
            outline.sections.last().unwrap().kind,
            OutlineSectionKind::Outro
        );
        assert_eq!(outline.segment_count(), 1);
    }
}
