//! Chat completion client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use newscast_core::{
    ChatRole, Completion, CompletionRequest, Error, LanguageModel, Result,
};

use crate::client::{classify_status, classify_transport, OpenAiClient};

/// [`LanguageModel`] over the OpenAI chat completions API.
#[derive(Clone)]
pub struct OpenAiChatModel {
    client: OpenAiClient,
}

impl OpenAiChatModel {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }

    async fn request_once(&self, body: &ChatRequestBody) -> Result<Completion> {
        let response = self
            .client
            .http
            .post(self.client.url("/chat/completions"))
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

        let parsed: ChatResponseBody = response
            .json()
            .await
            .map_err(|err| Error::Parse(format!("chat response: {err}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Parse("chat response has no choices".into()))?;
        let usage = parsed.usage.unwrap_or_default();
        Ok(Completion {
            text: choice.message.content,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let body = ChatRequestBody {
            model: self.client.config.chat_model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: match m.role {
                        ChatRole::System => "system",
                        ChatRole::User => "user",
                        ChatRole::Assistant => "assistant",
                    },
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .json_response
                .then(|| ResponseFormat { kind: "json_object" }),
        };
        self.client
            .with_retries("chat.completions", || self.request_once(&body))
            .await
    }

    fn model_name(&self) -> &str {
        &self.client.config.chat_model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequestBody {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
