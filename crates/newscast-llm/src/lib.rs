//! OpenAI-compatible provider clients
//!
//! Chat completions, embeddings, and speech synthesis over one HTTP client.
//! All three share the retry discipline in [`client`]: transient network
//! failures, rate limits, and 5xx responses are retried with exponential
//! backoff; auth and quota failures surface immediately.

pub mod chat;
pub mod client;
pub mod embeddings;
pub mod json;
pub mod speech;

pub use chat::OpenAiChatModel;
pub use client::{OpenAiClient, OpenAiConfig};
pub use embeddings::OpenAiEmbeddings;
pub use json::extract_json_object;
pub use speech::OpenAiSpeech;
