//! Embedding Provider — maps text batches to dense vectors.
//!
//! The engine only depends on the `EmbeddingProvider` trait. `HttpEmbeddingProvider`
//! talks to any OpenAI-compatible `/embeddings` endpoint (OpenAI, Ollama, TEI, vLLM).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider returned {returned} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, returned: usize },

    #[error("malformed embedding output: {0}")]
    Malformed(String),
}

/// Batch text → vector capability.
///
/// Implementations must return exactly one vector per input, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    /// Position of the input this vector belongs to; entry order when absent.
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Embeddings client for OpenAI-compatible HTTP endpoints.
#[derive(Clone)]
pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: &str,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(&self, batch: &[String]) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: batch,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request.send().await
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    /// Retries on transport errors, 429 and 5xx with exponential backoff (1s, 2s).
    async fn embed(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut last_error: Option<EmbeddingError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Embedding call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.send_once(batch).await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(EmbeddingError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Embedding API returned {}: {}", status, body);
                last_error = Some(EmbeddingError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(EmbeddingError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: EmbeddingResponse = response.json().await?;
            let vectors = into_ordered_vectors(parsed, batch.len())?;

            debug!(
                "Embedding call succeeded: inputs={}, dimension={}",
                vectors.len(),
                vectors.first().map(Vec::len).unwrap_or(0)
            );

            return Ok(vectors);
        }

        Err(last_error.unwrap_or(EmbeddingError::Malformed(
            "no embedding attempt was made".to_string(),
        )))
    }
}

/// Restores input order (providers may return entries out of order). Every input
/// position must be covered exactly once.
fn into_ordered_vectors(
    response: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if response.data.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            returned: response.data.len(),
        });
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (position, entry) in response.data.into_iter().enumerate() {
        let index = entry.index.unwrap_or(position);
        let slot = slots.get_mut(index).ok_or_else(|| {
            EmbeddingError::Malformed(format!(
                "embedding index {index} out of range for {expected} inputs"
            ))
        })?;
        if slot.replace(entry.embedding).is_some() {
            return Err(EmbeddingError::Malformed(format!(
                "duplicate embedding index {index}"
            )));
        }
    }
    Ok(slots.into_iter().flatten().collect())
}
