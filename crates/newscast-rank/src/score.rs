//! The ranking formula
//!
//! final = 0.25·recency + 0.35·topic_score·weight + 0.15·authority
//!       + 0.15·weight + 0.10·multi_topic_bonus

use std::collections::BTreeMap;

use newscast_core::{SourceTier, Story};

use crate::similarity::cosine;

/// Weight assumed for stories whose topic is missing from the weight map.
const DEFAULT_TOPIC_WEIGHT: f64 = 0.3;

/// Cross-topic similarity must exceed this to earn the multi-topic bonus.
const MULTI_TOPIC_SIM_FLOOR: f64 = 0.65;

/// Inputs shared by every story scored in one run.
pub struct ScoreInputs<'a> {
    /// Lower-cased topic label to weight.
    pub topic_weights: &'a BTreeMap<String, f64>,
    /// Topic label (original case) to keyword-bundle embedding.
    pub topic_vectors: &'a BTreeMap<String, Vec<f32>>,
    pub now: chrono::DateTime<chrono::Utc>,
}

/// Per-component score record, kept for the pick rationale.
#[derive(Debug, Clone)]
pub struct ScoreBreakdown {
    pub recency: f64,
    pub topic_score: f64,
    pub authority: f64,
    pub weight: f64,
    pub multi_topic_bonus: f64,
    pub final_score: f64,
}

impl ScoreBreakdown {
    /// Human-readable rationale attached to the pick.
    pub fn rationale(&self) -> String {
        format!(
            "score {:.3} (recency {:.2}, topic {:.2}, authority {:.2}, weight {:.2}, bonus {:.2})",
            self.final_score,
            self.recency,
            self.topic_score,
            self.authority,
            self.weight,
            self.multi_topic_bonus
        )
    }
}

/// Score one story against its topic and the other enabled topics.
pub fn score_story(story: &Story, embedding: &[f32], inputs: &ScoreInputs<'_>) -> ScoreBreakdown {
    let recency = (1.0 - story.age_hours(inputs.now) / 48.0).max(0.0);

    let topic_score = inputs
        .topic_vectors
        .get(&story.topic)
        .map(|v| cosine(embedding, v))
        .unwrap_or(0.0);

    let authority = SourceTier::classify(&story.domain).authority();

    let weight = inputs
        .topic_weights
        .get(&story.topic.to_lowercase())
        .copied()
        .unwrap_or(DEFAULT_TOPIC_WEIGHT);

    let mut multi_topic_bonus = 0.0;
    for (label, vector) in inputs.topic_vectors {
        if label.eq_ignore_ascii_case(&story.topic) {
            continue;
        }
        let similarity = cosine(embedding, vector);
        if similarity > MULTI_TOPIC_SIM_FLOOR {
            let other_weight = inputs
                .topic_weights
                .get(&label.to_lowercase())
                .copied()
                .unwrap_or(DEFAULT_TOPIC_WEIGHT);
            multi_topic_bonus += other_weight * similarity * 0.5;
        }
    }
    let multi_topic_bonus = multi_topic_bonus.min(1.0);

    let final_score = 0.25 * recency
        + 0.35 * topic_score * weight
        + 0.15 * authority
        + 0.15 * weight
        + 0.10 * multi_topic_bonus;

    ScoreBreakdown {
        recency,
        topic_score,
        authority,
        weight,
        multi_topic_bonus,
        final_score,
    }
}
