//! Per-domain deduplication

use std::collections::HashMap;

use newscast_core::Story;

/// Keep at most `max_per_domain` stories per (domain, topic) key, preferring
/// the most recently published. Returns (kept, removed); kept stories stay
/// in their original relative order.
pub fn dedup_by_domain_topic(
    stories: Vec<Story>,
    max_per_domain: usize,
) -> (Vec<Story>, Vec<Story>) {
    if max_per_domain == 0 {
        return (Vec::new(), stories);
    }

    // Rank each (domain, topic) group by published_at descending.
    let mut grouped: HashMap<(String, String), Vec<&Story>> = HashMap::new();
    for story in &stories {
        grouped
            .entry((story.domain.clone(), story.topic.clone()))
            .or_default()
            .push(story);
    }

    let mut keep_ids: Vec<String> = Vec::new();
    for group in grouped.values_mut() {
        group.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        keep_ids.extend(
            group
                .iter()
                .take(max_per_domain)
                .map(|s| s.id.clone()),
        );
    }
    let keep_ids: std::collections::HashSet<String> = keep_ids.into_iter().collect();

    let mut kept = Vec::with_capacity(stories.len());
    let mut removed = Vec::new();
    for story in stories {
        if keep_ids.contains(story.id.as_str()) {
            kept.push(story);
        } else {
            tracing::debug!(
                id = %story.id,
                domain = %story.domain,
                topic = %story.topic,
                "dropped by per-domain cap"
            );
            removed.push(story);
        }
    }
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn story(url: &str, domain_url: &str, topic: &str, hours_ago: i64) -> Story {
        let mut s = Story::new(
            format!("https://{domain_url}/{url}"),
            format!("Title {url}"),
            "Src",
            Utc::now() - Duration::hours(hours_ago),
            topic,
        );
        s.summary = Some("summary".into());
        s
    }

    #[test]
    fn caps_per_domain_topic_keeping_newest() {
        let stories = vec![
            story("a", "reuters.com", "AI", 10),
            story("b", "reuters.com", "AI", 1),
            story("c", "reuters.com", "AI", 5),
            story("d", "reuters.com", "VZ", 20),
        ];
        let (kept, removed) = dedup_by_domain_topic(stories, 2);
        assert_eq!(kept.len(), 3);
        assert_eq!(removed.len(), 1);
        // The oldest AI story from reuters is the one dropped.
        assert_eq!(removed[0].url, "https://reuters.com/a");
        // Different topic on the same domain is counted separately.
        assert!(kept.iter().any(|s| s.topic == "VZ"));
    }

    #[test]
    fn distinct_domains_unaffected() {
        let stories = vec![
            story("a", "reuters.com", "AI", 1),
            story("b", "cnbc.com", "AI", 2),
            story("c", "wsj.com", "AI", 3),
        ];
        let (kept, removed) = dedup_by_domain_topic(stories, 1);
        assert_eq!(kept.len(), 3);
        assert!(removed.is_empty());
    }
}
