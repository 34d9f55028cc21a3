//! Feed ingestion
//!
//! Fetches the RSS/Atom feeds of every enabled topic, normalizes items into
//! stories, applies the filter chain, and deduplicates by (domain, topic).
//! Every rejection is recorded with a reason in the detailed report; a
//! partial fetch is never fatal, only a run with zero accepted stories is.

pub mod dedup;
pub mod fetch;
pub mod filters;
pub mod ingestor;
pub mod normalize;
pub mod report;

pub use dedup::dedup_by_domain_topic;
pub use fetch::{FeedFetcher, HttpFeedFetcher};
pub use filters::{FilterOptions, FilterOutcome};
pub use ingestor::{IngestOptions, Ingestor};
pub use normalize::{is_google_news_feed, normalize_entry, recover_google_news_domain};
pub use report::{FilteredItem, IngestionOutput, IngestionReport, SourceScan, StoryRecord};
