//! Speech synthesis client

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use newscast_core::{Error, Result, SpeechRequest, SpeechSynthesizer};

use crate::client::{classify_status, classify_transport, OpenAiClient};

/// [`SpeechSynthesizer`] over the OpenAI speech API. Output format is MP3.
#[derive(Clone)]
pub struct OpenAiSpeech {
    client: OpenAiClient,
}

impl OpenAiSpeech {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }

    async fn synthesize_once(&self, body: &SpeechRequestBody) -> Result<Bytes> {
        let response = self
            .client
            .http
            .post(self.client.url("/audio/speech"))
            .headers(self.client.headers()?)
            .json(body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }
        let data = response.bytes().await.map_err(classify_transport)?;
        if data.is_empty() {
            return Err(Error::EmptyResult("speech response was empty".into()));
        }
        Ok(data)
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, request: SpeechRequest) -> Result<Bytes> {
        let body = SpeechRequestBody {
            model: self.client.config.speech_model.clone(),
            voice: request.voice,
            input: request.text,
            speed: request.speed,
            response_format: "mp3",
        };
        self.client
            .with_retries("audio.speech", || self.synthesize_once(&body))
            .await
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequestBody {
    model: String,
    voice: String,
    input: String,
    speed: f32,
    response_format: &'static str,
}
