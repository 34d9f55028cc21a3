//! Pipeline error taxonomy
//!
//! Every failure in the pipeline maps onto one of these kinds. Retry decisions
//! are made from the kind alone: transient network failures and rate limits
//! are retried with backoff, everything else surfaces immediately.

use thiserror::Error;

/// Errors produced anywhere in the newscast pipeline.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A network call failed in a way that is expected to succeed on retry.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// The provider asked us to slow down (HTTP 429 or equivalent).
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// The provider account is out of quota. Not retryable.
    #[error("provider quota exhausted: {0}")]
    ProviderQuota(String),

    /// Authentication with the provider failed. Not retryable.
    #[error("provider auth failed: {0}")]
    ProviderAuth(String),

    /// A response could not be decoded into the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Input or configuration violated an invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// A stage produced no output where output is mandatory.
    #[error("empty result: {0}")]
    EmptyResult(String),

    /// The object store rejected or lost an operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// Unrecoverable pipeline failure.
    #[error("{0}")]
    Fatal(String),
}

impl Error {
    /// Whether the agent runtime should retry the operation that produced
    /// this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::TransientNetwork(_) | Error::RateLimit(_) | Error::Parse(_)
        )
    }

    /// Short machine-readable kind tag, used in reports and envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::TransientNetwork(_) => "transient_network",
            Error::RateLimit(_) => "rate_limit",
            Error::ProviderQuota(_) => "provider_quota",
            Error::ProviderAuth(_) => "provider_auth",
            Error::Parse(_) => "parse_error",
            Error::Validation(_) => "validation_error",
            Error::EmptyResult(_) => "empty_result",
            Error::Storage(_) => "storage_error",
            Error::Fatal(_) => "fatal",
        }
    }
}

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(Error::TransientNetwork("reset".into()).is_retryable());
        assert!(Error::RateLimit("429".into()).is_retryable());
        assert!(Error::Parse("bad json".into()).is_retryable());
        assert!(!Error::ProviderAuth("401".into()).is_retryable());
        assert!(!Error::ProviderQuota("insufficient_quota".into()).is_retryable());
        assert!(!Error::Storage("put failed".into()).is_retryable());
    }
}
