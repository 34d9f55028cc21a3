//! Story ranking and selection
//!
//! Scores ingested stories by recency, topic relevance, source authority,
//! and topic weight, then selects a proportional, diverse set per topic.
//! Determinism: given identical inputs the selection is identical - sorts
//! are stable and score ties break by input order.

pub mod score;
pub mod select;
pub mod similarity;

pub use score::{score_story, ScoreBreakdown, ScoreInputs};
pub use select::{allocate_targets, Ranker, RankingReport, RankOutput};
pub use similarity::cosine;
