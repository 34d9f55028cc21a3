//! Embedding client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use newscast_core::{EmbeddingBackend, Error, Result};

use crate::client::{classify_status, classify_transport, OpenAiClient};

/// Inputs per embeddings request.
const BATCH_SIZE: usize = 64;

/// [`EmbeddingBackend`] over the OpenAI embeddings API.
#[derive(Clone)]
pub struct OpenAiEmbeddings {
    client: OpenAiClient,
    dimensions: usize,
}

impl OpenAiEmbeddings {
    pub fn new(client: OpenAiClient) -> Self {
        Self {
            client,
            dimensions: 1536,
        }
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequestBody {
            model: self.client.config.embedding_model.clone(),
            input: batch.to_vec(),
        };
        let response = self
            .client
            .http
            .post(self.client.url("/embeddings"))
            .headers(self.client.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        let mut parsed: EmbeddingResponseBody = response
            .json()
            .await
            .map_err(|err| Error::Parse(format!("embedding response: {err}")))?;
        if parsed.data.len() != batch.len() {
            return Err(Error::Parse(format!(
                "embedding response has {} vectors for {} inputs",
                parsed.data.len(),
                batch.len()
            )));
        }
        // Providers may reorder; the index field is authoritative.
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let vectors = self
                .client
                .with_retries("embeddings", || self.embed_batch(batch))
                .await?;
            all.extend(vectors);
        }
        Ok(all)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequestBody {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponseBody {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}
