//! Embedding provider interface and the Ollama-style HTTP implementation.

use crate::error::{MemoryError, Service};
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[async_trait]
/// Text to fixed-dimension vector model.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed several inputs; one vector per input, same order.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, MemoryError>;

    /// Embed a single input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| MemoryError::Embedding("empty embedding response".to_string()))
    }

    /// Model identifier used for every embedding.
    fn model_name(&self) -> &str;

    /// Cheap reachability check.
    async fn probe(&self) -> Result<(), MemoryError> {
        self.embed("ping").await.map(|_| ())
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding provider speaking the `/api/embed` protocol.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: Option<usize>,
    timeout: Duration,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for `base_url` using `model`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MemoryError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                MemoryError::Embedding(format!("failed to build http client: {err}"))
            })?;
        info!("initialized embedding provider (url={base_url}, model={model})");
        Ok(Self {
            client,
            base_url,
            model,
            dimensions: None,
            timeout,
        })
    }

    /// Reject responses whose vectors are not `dimensions` long.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    fn http_err(&self, err: reqwest::Error) -> MemoryError {
        MemoryError::from_http(Service::EmbeddingProvider, self.timeout, err)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            "requesting embeddings (model={}, inputs={})",
            self.model,
            inputs.len()
        );
        let body = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&EmbedRequest {
                model: &self.model,
                input: inputs,
            })
            .send()
            .await
            .map_err(|err| self.http_err(err))?
            .error_for_status()
            .map_err(|err| self.http_err(err))?
            .text()
            .await
            .map_err(|err| self.http_err(err))?;
        let response: EmbedResponse = serde_json::from_str(&body).map_err(|err| {
            MemoryError::Embedding(format!("malformed embedding response: {err}"))
        })?;
        check_embeddings(&response.embeddings, inputs.len(), self.dimensions)?;
        Ok(response.embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn probe(&self) -> Result<(), MemoryError> {
        self.client
            .get(format!("{}/api/version", self.base_url))
            .send()
            .await
            .map_err(|err| self.http_err(err))?
            .error_for_status()
            .map_err(|err| self.http_err(err))?;
        Ok(())
    }
}

/// Validate count and dimensionality of a provider response.
fn check_embeddings(
    embeddings: &[Vec<f32>],
    expected_count: usize,
    dimensions: Option<usize>,
) -> Result<(), MemoryError> {
    if embeddings.len() != expected_count {
        return Err(MemoryError::Embedding(format!(
            "expected {expected_count} embeddings, got {}",
            embeddings.len()
        )));
    }
    let expected = dimensions.or_else(|| embeddings.first().map(Vec::len));
    for embedding in embeddings {
        if embedding.is_empty() {
            return Err(MemoryError::Embedding("empty embedding vector".to_string()));
        }
        if let Some(expected) = expected
            && embedding.len() != expected
        {
            return Err(MemoryError::Embedding(format!(
                "dimension mismatch (expected={expected}, got={})",
                embedding.len()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::check_embeddings;
    use crate::error::MemoryError;

    #[test]
    fn accepts_consistent_vectors() {
        let vectors = vec![vec![0.1, 0.2], vec![0.3, 0.4]];
        assert!(check_embeddings(&vectors, 2, Some(2)).is_ok());
        assert!(check_embeddings(&vectors, 2, None).is_ok());
    }

    #[test]
    fn rejects_count_and_dimension_mismatches() {
        let vectors = vec![vec![0.1, 0.2], vec![0.3]];
        assert!(matches!(
            check_embeddings(&vectors, 3, None),
            Err(MemoryError::Embedding(_))
        ));
        assert!(matches!(
            check_embeddings(&vectors, 2, None),
            Err(MemoryError::Embedding(message)) if message.contains("dimension mismatch")
        ));
        assert!(check_embeddings(&[vec![0.1, 0.2]], 1, Some(768)).is_err());
    }

    #[test]
    fn rejects_empty_vectors() {
        assert!(check_embeddings(&[Vec::new()], 1, None).is_err());
    }
}
