//! Topic configuration

use serde::{Deserialize, Serialize};

/// One user-configured topic: a weight, its feeds, and its match keywords.
///
/// Set-level invariants (weights over enabled topics sum to 1, labels unique
/// case-insensitively) are enforced by the config store on save, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicConfig {
    pub label: String,
    /// Proportional coverage weight in [0, 1]. A weight of 0 disables the topic.
    pub weight: f64,
    /// Feed URLs polled for this topic, in priority order.
    #[serde(default)]
    pub feeds: Vec<String>,
    /// Keywords used for relevance matching, in priority order.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl TopicConfig {
    pub fn new(label: impl Into<String>, weight: f64) -> Self {
        Self {
            label: label.into(),
            weight,
            feeds: Vec::new(),
            keywords: Vec::new(),
        }
    }

    /// Whether the topic participates in runs.
    pub fn enabled(&self) -> bool {
        self.weight > 0.0
    }

    /// The keyword bundle embedded once per topic by the ranking stage.
    pub fn keyword_bundle(&self) -> String {
        if self.keywords.is_empty() {
            self.label.clone()
        } else {
            self.keywords.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_bundle_falls_back_to_label() {
        let mut topic = TopicConfig::new("AI", 0.5);
        assert_eq!(topic.keyword_bundle(), "AI");
        topic.keywords = vec!["artificial intelligence".into(), "machine learning".into()];
        assert_eq!(
            topic.keyword_bundle(),
            "artificial intelligence, machine learning"
        );
    }
}
