//! The ingestion stage driver

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use newscast_core::{Error, Result, TopicConfig};

use crate::dedup::dedup_by_domain_topic;
use crate::fetch::FeedFetcher;
use crate::filters::{apply_filters, FilterOptions, FilterOutcome};
use crate::normalize::{is_google_news_feed, normalize_entry};
use crate::report::{FilteredItem, IngestionOutput, IngestionReport, SourceScan, StoryRecord};

/// Per-run ingestion settings, derived from the dashboard record. The age
/// window arrives as the precomputed `cutoff` instant.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub min_content_length: usize,
    pub max_stories_per_domain: usize,
    pub banned_domains: Vec<String>,
}

/// Fetches and filters stories for every enabled topic.
pub struct Ingestor {
    fetcher: Arc<dyn FeedFetcher>,
}

impl Ingestor {
    pub fn new(fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self { fetcher }
    }

    /// Run ingestion over `topics`. Stories older than `cutoff` are
    /// rejected. Fails only when every source fails or nothing survives the
    /// filters.
    pub async fn ingest(
        &self,
        topics: &[TopicConfig],
        cutoff: DateTime<Utc>,
        options: &IngestOptions,
        cancel: &CancellationToken,
    ) -> Result<IngestionOutput> {
        let now = Utc::now();
        let filter_options = FilterOptions {
            min_content_length: options.min_content_length,
            banned_domains: options.banned_domains.clone(),
            cutoff,
            now,
        };

        let mut report = IngestionReport::default();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut stories = Vec::new();

        for topic in topics {
            for feed_url in &topic.feeds {
                if cancel.is_cancelled() {
                    return Err(Error::Fatal("run cancelled during ingestion".into()));
                }

                let feed = match self.fetcher.fetch(feed_url).await {
                    Ok(feed) => feed,
                    Err(err) => {
                        tracing::warn!(url = %feed_url, topic = %topic.label, error = %err, "feed fetch failed");
                        report.sources.push(SourceScan {
                            url: feed_url.clone(),
                            topic: topic.label.clone(),
                            items: 0,
                            status: format!("error: {err}"),
                        });
                        continue;
                    }
                };

                let from_google = is_google_news_feed(feed_url);
                let source_label = feed
                    .title
                    .as_ref()
                    .map(|t| t.content.clone())
                    .unwrap_or_else(|| feed_url.clone());

                report.sources.push(SourceScan {
                    url: feed_url.clone(),
                    topic: topic.label.clone(),
                    items: feed.entries.len() as u32,
                    status: "ok".to_string(),
                });
                report.total_items += feed.entries.len() as u32;

                for entry in &feed.entries {
                    let Some(story) = normalize_entry(entry, &topic.label, &source_label, now)
                    else {
                        report.filtered.push(FilteredItem {
                            url: entry
                                .links
                                .first()
                                .map(|l| l.href.clone())
                                .unwrap_or_default(),
                            title: entry
                                .title
                                .as_ref()
                                .map(|t| t.content.clone())
                                .unwrap_or_default(),
                            topic: topic.label.clone(),
                            reason: "Missing required fields".to_string(),
                        });
                        continue;
                    };

                    match apply_filters(
                        &story,
                        &filter_options,
                        &seen_urls,
                        &topic.keywords,
                        from_google,
                    ) {
                        FilterOutcome::Accepted => {
                            seen_urls.insert(story.url.clone());
                            report.records.push(StoryRecord {
                                id: story.id.clone(),
                                title: story.title.clone(),
                                domain: story.domain.clone(),
                                topic: story.topic.clone(),
                                accepted: true,
                                note: String::new(),
                            });
                            report.bump_topic(&topic.label);
                            stories.push(story);
                        }
                        FilterOutcome::Rejected(reason) => {
                            report.filtered.push(FilteredItem {
                                url: story.url.clone(),
                                title: story.title.clone(),
                                topic: topic.label.clone(),
                                reason: reason.clone(),
                            });
                            report.records.push(StoryRecord {
                                id: story.id,
                                title: story.title,
                                domain: story.domain,
                                topic: story.topic,
                                accepted: false,
                                note: reason,
                            });
                        }
                    }
                }
            }
        }

        let scanned = report.sources.len();
        let succeeded = report.sources.iter().filter(|s| s.succeeded()).count();
        if scanned > 0 && succeeded == 0 {
            return Err(Error::TransientNetwork(format!(
                "all {scanned} feed sources failed"
            )));
        }

        let (kept, removed) = dedup_by_domain_topic(stories, options.max_stories_per_domain);
        for story in &removed {
            report.filtered.push(FilteredItem {
                url: story.url.clone(),
                title: story.title.clone(),
                topic: story.topic.clone(),
                reason: "Per-domain cap".to_string(),
            });
            if let Some(record) = report.records.iter_mut().find(|r| r.id == story.id) {
                record.accepted = false;
                record.note = "Per-domain cap".to_string();
            }
            if let Some(entry) = report.topics.iter_mut().find(|t| t.topic == story.topic) {
                entry.count = entry.count.saturating_sub(1);
            }
        }

        if kept.is_empty() {
            return Err(Error::EmptyResult(
                "no stories survived ingestion filters".into(),
            ));
        }

        tracing::info!(
            accepted = kept.len(),
            filtered = report.filtered.len(),
            sources = scanned,
            "ingestion complete"
        );
        Ok(IngestionOutput {
            stories: kept,
            report,
        })
    }
}
