//! Episode outline types

use serde::{Deserialize, Serialize};

/// Structural position of an outline section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlineSectionKind {
    Intro,
    Segment,
    Outro,
}

/// How the stories inside a segment relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    CauseEffect,
    CommonTheme,
    Contrast,
    Timeline,
    IndustryImpact,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CauseEffect => "cause_effect",
            Self::CommonTheme => "common_theme",
            Self::Contrast => "contrast",
            Self::Timeline => "timeline",
            Self::IndustryImpact => "industry_impact",
        }
    }
}

/// One planned section of the episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineSection {
    pub kind: OutlineSectionKind,
    pub title: String,
    /// Word budget for the scriptwriter.
    pub target_words: u32,
    /// Stable ids of the stories covered by this section. Empty for intro
    /// and outro.
    #[serde(default)]
    pub refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionType>,
    /// One sentence explaining how the section's stories hang together.
    #[serde(default)]
    pub bridge: String,
}

/// The thematic plan produced by the outline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outline {
    /// Lead sentence of the intro, chosen for surprise or impact.
    pub opening_hook: String,
    pub sections: Vec<OutlineSection>,
}

impl Outline {
    /// Story ids referenced by any segment, in first-seen order.
    pub fn referenced_ids(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for section in &self.sections {
            for id in &section.refs {
                if !seen.contains(id) {
                    seen.push(id.clone());
                }
            }
        }
        seen
    }

    /// Number of thematic segments (excluding intro and outro).
    pub fn segment_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| s.kind == OutlineSectionKind::Segment)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referenced_ids_dedupes_in_order() {
        let outline = Outline {
            opening_hook: "hook".into(),
            sections: vec![
                OutlineSection {
                    kind: OutlineSectionKind::Segment,
                    title: "A".into(),
                    target_words: 300,
                    refs: vec!["x".into(), "y".into()],
                    connection: Some(ConnectionType::CommonTheme),
                    bridge: "both chase the same market".into(),
                },
                OutlineSection {
                    kind: OutlineSectionKind::Segment,
                    title: "B".into(),
                    target_words: 200,
                    refs: vec!["y".into(), "z".into()],
                    connection: Some(ConnectionType::Contrast),
                    bridge: "opposite bets".into(),
                },
            ],
        };
        assert_eq!(outline.referenced_ids(), vec!["x", "y", "z"]);
        assert_eq!(outline.segment_count(), 2);
    }
}
