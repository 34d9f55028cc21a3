//! Provider traits
//!
//! The pipeline talks to every external system through these seams so that
//! tests (and alternative vendors) can swap implementations freely.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider to return a JSON object body.
    pub json_response: bool,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: 0.7,
            max_tokens: 4096,
            json_response: false,
        }
    }

    pub fn json(mut self) -> Self {
        self.json_response = true;
        self
    }
}

/// A chat completion result.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Large-language-model completion interface.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one chat completion.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;

    /// Model identifier for logging.
    fn model_name(&self) -> &str;
}

/// Dense-embedding interface. Implementations batch internally.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed each text, preserving order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embedding dimensionality.
    fn dimensions(&self) -> usize;
}

/// One TTS synthesis request.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    /// Opaque provider voice identifier.
    pub voice: String,
    pub text: String,
    /// Playback speed multiplier.
    pub speed: f32,
}

/// Text-to-speech interface. Output is always MP3.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one unit of narration. An empty buffer is a provider bug
    /// and is treated as fatal by the audio stage.
    async fn synthesize(&self, request: SpeechRequest) -> Result<Bytes>;
}

/// Object storage interface over the run artifact layout.
///
/// Keys are forward-slash paths relative to the bucket root
/// (`runs/index.json`, `episodes/<run_id>_manifest.json`, ...). Writes are
/// last-writer-wins; no transactional guarantees.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object. `Err(Error::Storage)` when absent.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Store an object, returning its public URL.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Keys under a prefix, unordered.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Public URL an object would have at `key`.
    fn public_url(&self, key: &str) -> String;
}
