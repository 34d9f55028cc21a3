//! Proportional, diversity-guarded selection

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use newscast_core::{EmbeddingBackend, Pick, Result, Story, TopicConfig, TopicCount};

use crate::score::{score_story, ScoreInputs};
use crate::similarity::cosine;

/// Same-topic cosine ceiling; a candidate closer than this to an already
/// selected story is skipped.
const DIVERSITY_CEILING: f64 = 0.85;

/// Ranking stage report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingReport {
    pub candidates: u32,
    /// Planned per-topic targets before selection.
    pub targets: Vec<TopicCount>,
    /// Reason strings for candidates that were not selected.
    pub rejections: Vec<String>,
}

/// Ranking stage output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankOutput {
    pub picks: Vec<Pick>,
    /// Actual per-topic pick counts.
    pub distribution: Vec<TopicCount>,
    pub report: RankingReport,
}

/// Split `target_count` across topics proportionally to weight.
///
/// Topics are ordered by weight descending. Every topic gets
/// `round(target_count · weight)` with a floor of one; the highest-weight
/// topic absorbs the rounding residual in either direction. When the floor
/// alone overshoots the target, the lowest-weight topics are trimmed first.
pub fn allocate_targets(topics: &[(String, f64)], target_count: usize) -> Vec<(String, usize)> {
    if topics.is_empty() || target_count == 0 {
        return Vec::new();
    }

    let mut ordered: Vec<(String, f64)> = topics.to_vec();
    ordered.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut targets: Vec<(String, usize)> = ordered
        .iter()
        .map(|(label, weight)| {
            let raw = (target_count as f64 * weight).round() as usize;
            (label.clone(), raw.max(1))
        })
        .collect();

    let total: usize = targets.iter().map(|(_, n)| n).sum();
    if total < target_count {
        targets[0].1 += target_count - total;
    } else if total > target_count {
        let mut excess = total - target_count;
        // Residual comes out of the highest-weight topic first, but never
        // below one story per topic.
        let give = targets[0].1.saturating_sub(1).min(excess);
        targets[0].1 -= give;
        excess -= give;
        // Floor overshoot: trim lowest-weight topics to zero.
        for slot in targets.iter_mut().rev() {
            if excess == 0 {
                break;
            }
            let give = slot.1.min(excess);
            slot.1 -= give;
            excess -= give;
        }
    }

    targets
}

/// Embeds, scores, and selects stories.
pub struct Ranker {
    embeddings: Arc<dyn EmbeddingBackend>,
}

impl Ranker {
    pub fn new(embeddings: Arc<dyn EmbeddingBackend>) -> Self {
        Self { embeddings }
    }

    /// Rank `stories` and select `target_count` picks proportional to the
    /// enabled topic weights. Empty input short-circuits to empty output.
    pub async fn rank(
        &self,
        stories: &[Story],
        topics: &[TopicConfig],
        target_count: usize,
    ) -> Result<RankOutput> {
        if stories.is_empty() || target_count == 0 {
            return Ok(RankOutput::default());
        }

        // Embed stories in one batch, topic keyword bundles in another.
        // Bundles are deduplicated per topic label.
        let story_texts: Vec<String> = stories.iter().map(|s| s.embedding_text()).collect();
        let story_vectors = self.embeddings.embed(&story_texts).await?;

        let enabled: Vec<&TopicConfig> = topics.iter().filter(|t| t.enabled()).collect();
        let bundle_texts: Vec<String> = enabled.iter().map(|t| t.keyword_bundle()).collect();
        let bundle_vectors = self.embeddings.embed(&bundle_texts).await?;

        let topic_vectors: BTreeMap<String, Vec<f32>> = enabled
            .iter()
            .zip(bundle_vectors)
            .map(|(t, v)| (t.label.clone(), v))
            .collect();
        let topic_weights: BTreeMap<String, f64> = enabled
            .iter()
            .map(|t| (t.label.to_lowercase(), t.weight))
            .collect();

        let now = Utc::now();
        let inputs = ScoreInputs {
            topic_weights: &topic_weights,
            topic_vectors: &topic_vectors,
            now,
        };

        let mut report = RankingReport {
            candidates: stories.len() as u32,
            ..Default::default()
        };

        // Score every story that has a usable embedding.
        struct Candidate<'a> {
            story: &'a Story,
            embedding: &'a [f32],
            score: f64,
            rationale: String,
        }
        let mut by_topic: BTreeMap<String, Vec<Candidate<'_>>> = BTreeMap::new();
        for (story, embedding) in stories.iter().zip(story_vectors.iter()) {
            if embedding.iter().all(|x| *x == 0.0) {
                tracing::warn!(id = %story.id, "missing embedding, skipping story");
                report
                    .rejections
                    .push(format!("{}: missing embedding", story.id));
                continue;
            }
            let breakdown = score_story(story, embedding, &inputs);
            by_topic.entry(story.topic.clone()).or_default().push(Candidate {
                story,
                embedding,
                score: breakdown.final_score,
                rationale: breakdown.rationale(),
            });
        }

        // Stable by-score ordering; ties keep input order.
        for candidates in by_topic.values_mut() {
            candidates.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let weight_list: Vec<(String, f64)> = enabled
            .iter()
            .map(|t| (t.label.clone(), t.weight))
            .collect();
        let targets = allocate_targets(&weight_list, target_count);
        report.targets = targets
            .iter()
            .map(|(topic, n)| TopicCount {
                topic: topic.clone(),
                count: *n as u32,
            })
            .collect();

        let mut picks: Vec<Pick> = Vec::with_capacity(target_count);
        let mut distribution: Vec<TopicCount> = Vec::new();
        for (topic, quota) in &targets {
            let mut taken = 0usize;
            let mut picked_embeddings: Vec<&[f32]> = Vec::new();
            let Some(candidates) = by_topic.get(topic.as_str()) else {
                if *quota > 0 {
                    tracing::warn!(topic = %topic, quota, "no candidates for topic");
                }
                continue;
            };
            for candidate in candidates {
                if taken >= *quota {
                    report.rejections.push(format!(
                        "{}: topic quota filled ({topic})",
                        candidate.story.id
                    ));
                    continue;
                }
                let too_similar = picked_embeddings
                    .iter()
                    .map(|picked| cosine(candidate.embedding, picked))
                    .find(|sim| *sim > DIVERSITY_CEILING);
                if let Some(sim) = too_similar {
                    report.rejections.push(format!(
                        "{}: diversity constraint (cosine {sim:.2} to a selected story)",
                        candidate.story.id
                    ));
                    continue;
                }
                picked_embeddings.push(candidate.embedding);
                picks.push(Pick {
                    story: candidate.story.clone(),
                    topic: topic.clone(),
                    score: candidate.score,
                    rationale: candidate.rationale.clone(),
                });
                taken += 1;
            }
            if taken < *quota {
                tracing::warn!(topic = %topic, taken, quota, "topic target not filled");
            }
            if taken > 0 {
                distribution.push(TopicCount {
                    topic: topic.clone(),
                    count: taken as u32,
                });
            }
        }

        tracing::info!(
            candidates = stories.len(),
            selected = picks.len(),
            "ranking complete"
        );
        Ok(RankOutput {
            picks,
            distribution,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use newscast_core::Error;

    #[test]
    fn allocation_matches_weights() {
        let targets = allocate_targets(
            &[
                ("AI".to_string(), 0.5),
                ("VZ".to_string(), 0.3),
                ("ACN".to_string(), 0.2),
            ],
            5,
        );
        let total: usize = targets.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 5);
        // Every topic keeps at least one slot; the rounding excess comes out
        // of the highest-weight topic.
        let get = |label: &str| targets.iter().find(|(l, _)| l == label).unwrap().1;
        assert_eq!(get("ACN"), 1);
        assert_eq!(get("VZ"), 2);
        assert_eq!(get("AI"), 2);
    }

    #[test]
    fn allocation_gives_slack_to_heaviest() {
        let targets = allocate_targets(
            &[
                ("AI".to_string(), 0.34),
                ("VZ".to_string(), 0.33),
                ("ACN".to_string(), 0.33),
            ],
            4,
        );
        let total: usize = targets.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 4);
        assert_eq!(targets[0].0, "AI");
        assert_eq!(targets[0].1, 2);
    }

    #[test]
    fn allocation_trims_when_topics_exceed_target() {
        let targets = allocate_targets(
            &[
                ("A".to_string(), 0.4),
                ("B".to_string(), 0.3),
                ("C".to_string(), 0.2),
                ("D".to_string(), 0.1),
            ],
            2,
        );
        let total: usize = targets.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 2);
        // Lowest-weight topics lose their slot first.
        assert_eq!(targets[3].1, 0);
    }

    /// Embeds each text onto a fixed vector chosen by marker words, so tests
    /// control topic relatedness and pairwise similarity exactly.
    struct AxisEmbeddings;

    #[async_trait]
    impl EmbeddingBackend for AxisEmbeddings {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    // Marker words before topic words: story texts contain both.
                    if lower.contains("dup") {
                        // Nearly identical to the "ai" axis.
                        vec![0.99, 0.141, 0.0]
                    } else if lower.contains("policy") {
                        vec![0.7, 0.0, 0.714]
                    } else if lower.contains("chip") {
                        vec![0.5, 0.5, 0.707]
                    } else if lower.contains("spectrum") {
                        vec![0.6, 0.8, 0.0]
                    } else if lower.contains("towers") {
                        vec![0.0, 0.6, 0.8]
                    } else if lower.contains("ai") {
                        vec![1.0, 0.0, 0.0]
                    } else if lower.contains("verizon") {
                        vec![0.0, 1.0, 0.0]
                    } else {
                        vec![0.0, 0.0, 1.0]
                    }
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    struct FailingEmbeddings;

    #[async_trait]
    impl EmbeddingBackend for FailingEmbeddings {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(Error::TransientNetwork("down".into()))
        }

        fn dimensions(&self) -> usize {
            0
        }
    }

    fn story(url: &str, title: &str, topic: &str, hours_ago: i64) -> Story {
        let mut s = Story::new(
            format!("https://reuters.com/{url}"),
            title,
            "Reuters",
            Utc::now() - Duration::hours(hours_ago),
            topic,
        );
        s.summary = Some(title.to_string());
        s
    }

    fn topics() -> Vec<TopicConfig> {
        let mut ai = TopicConfig::new("AI", 0.5);
        ai.keywords = vec!["ai".to_string()];
        let mut vz = TopicConfig::new("VZ", 0.3);
        vz.keywords = vec!["verizon".to_string()];
        let mut acn = TopicConfig::new("ACN", 0.2);
        acn.keywords = vec!["accenture".to_string()];
        vec![ai, vz, acn]
    }

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let ranker = Ranker::new(Arc::new(AxisEmbeddings));
        let output = ranker.rank(&[], &topics(), 5).await.unwrap();
        assert!(output.picks.is_empty());
    }

    #[tokio::test]
    async fn proportional_selection_with_diversity() {
        let stories = vec![
            story("a1", "ai breakthrough one", "AI", 1),
            story("a2", "ai dup of the first", "AI", 2),
            story("a3", "ai policy shift", "AI", 3),
            story("a4", "ai chip supply", "AI", 4),
            story("v1", "verizon earnings", "VZ", 1),
            story("v2", "verizon spectrum", "VZ", 2),
            story("v3", "verizon towers", "VZ", 3),
            story("c1", "accenture bookings", "ACN", 1),
        ];
        let ranker = Ranker::new(Arc::new(AxisEmbeddings));
        let output = ranker.rank(&stories, &topics(), 5).await.unwrap();

        let total: u32 = output.distribution.iter().map(|d| d.count).sum();
        assert_eq!(total, 5);
        assert_eq!(output.picks.len(), 5);
        // Every enabled topic with stories lands at least one pick.
        for label in ["AI", "VZ", "ACN"] {
            assert!(
                output.distribution.iter().any(|d| d.topic == label && d.count >= 1),
                "{label} missing from distribution"
            );
        }
        // Same-topic picks stay under the diversity ceiling.
        let embedder = AxisEmbeddings;
        let texts: Vec<String> = output
            .picks
            .iter()
            .map(|p| p.story.embedding_text())
            .collect();
        let vectors = embedder.embed(&texts).await.unwrap();
        for i in 0..output.picks.len() {
            for j in (i + 1)..output.picks.len() {
                if output.picks[i].topic == output.picks[j].topic {
                    assert!(cosine(&vectors[i], &vectors[j]) <= 0.85 + 1e-9);
                }
            }
        }
        // The near-duplicate was rejected for diversity.
        assert!(output
            .report
            .rejections
            .iter()
            .any(|r| r.contains("diversity constraint")));
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let ranker = Ranker::new(Arc::new(FailingEmbeddings));
        let stories = vec![story("a", "ai", "AI", 1)];
        assert!(ranker.rank(&stories, &topics(), 3).await.is_err());
    }
}
