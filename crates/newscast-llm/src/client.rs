//! Shared HTTP client and retry policy

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;

use newscast_core::{Error, Result};

/// Connection settings shared by the chat, embedding, and speech clients.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub endpoint: String,
    pub api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub speech_model: String,
    pub timeout: Duration,
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles per attempt.
    pub initial_backoff: Duration,
    /// Ceiling for any single backoff sleep.
    pub max_backoff: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            speech_model: "tts-1".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl OpenAiConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

/// HTTP plumbing shared by the three provider clients.
#[derive(Clone)]
pub struct OpenAiClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| Error::Fatal(format!("build http client: {err}")))?;
        Ok(Self { http, config })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    pub(crate) fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|err| Error::ProviderAuth(format!("invalid api key: {err}")))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Run `op` under the provider retry policy: 1s/2s/4s backoff capped at
    /// [`OpenAiConfig::max_backoff`], retrying only rate limits and
    /// transient network failures.
    pub(crate) async fn with_retries<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.config.initial_backoff;
        let mut last_err = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    what,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "provider call failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(self.config.max_backoff);
            }
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if matches!(err, Error::TransientNetwork(_) | Error::RateLimit(_)) => {
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| Error::Fatal(format!("{what}: retries exhausted"))))
    }
}

/// Map a provider HTTP status + body onto the error taxonomy.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> Error {
    if status == StatusCode::TOO_MANY_REQUESTS {
        // OpenAI reports exhausted quota with 429 as well; that one is
        // pointless to retry.
        if body.contains("insufficient_quota") {
            return Error::ProviderQuota(truncate(body));
        }
        return Error::RateLimit(truncate(body));
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Error::ProviderAuth(format!("HTTP {status}: {}", truncate(body)));
    }
    if status.is_server_error() {
        return Error::TransientNetwork(format!("HTTP {status}: {}", truncate(body)));
    }
    Error::Fatal(format!("HTTP {status}: {}", truncate(body)))
}

/// Map a reqwest transport error onto the taxonomy.
pub(crate) fn classify_transport(err: reqwest::Error) -> Error {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        Error::TransientNetwork(err.to_string())
    } else if err.is_decode() {
        Error::Parse(err.to_string())
    } else {
        Error::TransientNetwork(err.to_string())
    }
}

fn truncate(body: &str) -> String {
    const MAX: usize = 400;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut cut = MAX;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…", &body[..cut])
    }
}
