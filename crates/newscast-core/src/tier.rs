//! Source-tier classification
//!
//! Domains are bucketed into five authority tiers by substring match against
//! fixed lists. Tier 1 and 2 are trusted outlets, tier 4 is corporate or
//! pre-curated aggregator content, tiers 3 and 5 are excluded at ingestion.

use serde::{Deserialize, Serialize};

/// Journalistic authority tier of a source domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    /// Major wire services and national outlets.
    Tier1,
    /// Business and technology majors.
    Tier2,
    /// Regional and industry press.
    Tier3,
    /// Corporate and company-owned outlets.
    Tier4,
    /// Unknown sources.
    Tier5,
    /// Google News aggregator items whose true source could not be recovered.
    GoogleNews,
}

/// Major wires and national outlets.
const TIER1_DOMAINS: &[&str] = &[
    "reuters.com",
    "apnews.com",
    "bloomberg.com",
    "wsj.com",
    "nytimes.com",
    "washingtonpost.com",
    "ft.com",
    "bbc.com",
    "bbc.co.uk",
    "npr.org",
    "theguardian.com",
    "economist.com",
    "axios.com",
    "politico.com",
];

/// Business and technology majors.
const TIER2_DOMAINS: &[&str] = &[
    "cnbc.com",
    "techcrunch.com",
    "theverge.com",
    "wired.com",
    "arstechnica.com",
    "forbes.com",
    "businessinsider.com",
    "fortune.com",
    "marketwatch.com",
    "barrons.com",
    "zdnet.com",
    "engadget.com",
    "venturebeat.com",
    "theinformation.com",
];

/// Regional and industry press. Excluded from ingestion.
const TIER3_DOMAINS: &[&str] = &[
    "bizjournals.com",
    "patch.com",
    "seekingalpha.com",
    "benzinga.com",
    "fool.com",
    "thestreet.com",
    "investorplace.com",
    "streetinsider.com",
];

/// Corporate and company-owned outlets, including press-release wires.
const TIER4_DOMAINS: &[&str] = &[
    "prnewswire.com",
    "businesswire.com",
    "globenewswire.com",
    "medium.com",
    "substack.com",
    "newsroom.",
    "investor.",
    "blogs.",
];

/// The Google News aggregator host.
pub const GOOGLE_NEWS_DOMAIN: &str = "news.google.com";

impl SourceTier {
    /// Classify a normalized domain.
    pub fn classify(domain: &str) -> SourceTier {
        if domain.contains(GOOGLE_NEWS_DOMAIN) {
            return SourceTier::GoogleNews;
        }
        let matches_any = |list: &[&str]| list.iter().any(|d| domain.contains(d));
        if matches_any(TIER1_DOMAINS) {
            SourceTier::Tier1
        } else if matches_any(TIER2_DOMAINS) {
            SourceTier::Tier2
        } else if matches_any(TIER3_DOMAINS) {
            SourceTier::Tier3
        } else if matches_any(TIER4_DOMAINS) {
            SourceTier::Tier4
        } else {
            SourceTier::Tier5
        }
    }

    /// Authority factor used by the ranking formula.
    pub fn authority(self) -> f64 {
        match self {
            SourceTier::Tier1 => 1.0,
            SourceTier::Tier2 => 0.85,
            SourceTier::Tier3 => 0.70,
            SourceTier::Tier4 => 0.55,
            SourceTier::Tier5 => 0.40,
            SourceTier::GoogleNews => 0.50,
        }
    }

    /// Whether stories from this tier are accepted at ingestion.
    pub fn accepted(self) -> bool {
        !matches!(self, SourceTier::Tier3 | SourceTier::Tier5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_by_substring() {
        assert_eq!(SourceTier::classify("reuters.com"), SourceTier::Tier1);
        assert_eq!(SourceTier::classify("techcrunch.com"), SourceTier::Tier2);
        assert_eq!(SourceTier::classify("seekingalpha.com"), SourceTier::Tier3);
        assert_eq!(SourceTier::classify("prnewswire.com"), SourceTier::Tier4);
        assert_eq!(SourceTier::classify("myblog.example"), SourceTier::Tier5);
        assert_eq!(
            SourceTier::classify("news.google.com"),
            SourceTier::GoogleNews
        );
    }

    #[test]
    fn subdomains_match() {
        assert_eq!(SourceTier::classify("feeds.reuters.com"), SourceTier::Tier1);
        assert_eq!(
            SourceTier::classify("newsroom.somecorp.com"),
            SourceTier::Tier4
        );
    }

    #[test]
    fn acceptance_excludes_tier3_and_tier5() {
        assert!(SourceTier::Tier1.accepted());
        assert!(SourceTier::Tier2.accepted());
        assert!(!SourceTier::Tier3.accepted());
        assert!(SourceTier::Tier4.accepted());
        assert!(!SourceTier::Tier5.accepted());
        assert!(SourceTier::GoogleNews.accepted());
    }

    #[test]
    fn authority_table() {
        assert_eq!(SourceTier::Tier1.authority(), 1.0);
        assert_eq!(SourceTier::Tier2.authority(), 0.85);
        assert_eq!(SourceTier::Tier3.authority(), 0.70);
        assert_eq!(SourceTier::Tier4.authority(), 0.55);
        assert_eq!(SourceTier::Tier5.authority(), 0.40);
        assert_eq!(SourceTier::GoogleNews.authority(), 0.50);
    }
}
