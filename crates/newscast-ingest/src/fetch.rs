//! Feed fetching

use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::Feed;

use newscast_core::{Error, Result};

/// Per-feed fetch timeout.
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetch-and-parse seam so tests can feed canned XML through the same
/// ingestion path.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Feed>;
}

/// Production fetcher over reqwest + feed-rs.
pub struct HttpFeedFetcher {
    http: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("newscast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| Error::Fatal(format!("build feed client: {err}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Feed> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| Error::TransientNetwork(format!("fetch {url}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::TransientNetwork(format!("fetch {url}: HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| Error::TransientNetwork(format!("read {url}: {err}")))?;
        feed_rs::parser::parse(body.as_ref())
            .map_err(|err| Error::Parse(format!("parse feed {url}: {err}")))
    }
}
