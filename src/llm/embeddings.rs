

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};


#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,

    #[error("Expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Provider not implemented: {0}")]
    NotImplemented(String),

    #[error("Embedding worker failed: {0}")]
    Worker(String),
}


/// Text to fixed-length vector. Must be deterministic for a given input.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimensions(&self) -> Option<usize> {
        None
    }
}


#[derive(Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}


pub struct EmbeddingGenerator {
    provider: String,
    url: String,
    model: String,
    api_key: Option<String>,
    dimensions: Option<usize>,
    client: Client,
}

impl EmbeddingGenerator {

    pub fn new(
        provider: impl Into<String>,
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        dimensions: Option<usize>,
        timeout_secs: u64,
    ) -> Result<Self, EmbeddingError> {
        let provider = provider.into().to_lowercase();
        let model = model.into();

        info!("EmbeddingGenerator initialized: provider={}, model={}", provider, model);

        Ok(Self {
            provider,
            url: url.into().trim_end_matches('/').to_string(),
            model,
            api_key,
            dimensions,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()?,
        })
    }

    async fn generate_ollama(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = OllamaEmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.url))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OllamaEmbeddingResponse>()
            .await?;

        Ok(response.embedding)
    }

    async fn generate_openai(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::InvalidResponse("API key required".to_string()))?;

        let request = OpenAIEmbeddingRequest {
            model: self.model.clone(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
    }


    pub fn model(&self) -> &str {
        &self.model
    }


    pub fn provider(&self) -> &str {
        &self.provider
    }
}

#[async_trait]
impl Embedder for EmbeddingGenerator {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        let embedding = match self.provider.as_str() {
            "ollama" => self.generate_ollama(text).await?,
            "openai" => self.generate_openai(text).await?,
            other => return Err(EmbeddingError::NotImplemented(other.to_string())),
        };

        if let Some(expected) = self.dimensions {
            if embedding.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        debug!("Embedded {} chars -> {} dims", text.chars().count(), embedding.len());
        Ok(embedding)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }
}


type EmbedFn = dyn Fn(&str) -> Result<Vec<f32>, EmbeddingError> + Send + Sync;

/// Runs a synchronous, CPU-bound embedding function on the blocking pool.
pub struct BlockingEmbedder {
    embed_fn: Arc<EmbedFn>,
    dimensions: Option<usize>,
}

impl BlockingEmbedder {
    pub fn new<F>(embed_fn: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<f32>, EmbeddingError> + Send + Sync + 'static,
    {
        Self {
            embed_fn: Arc::new(embed_fn),
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

#[async_trait]
impl Embedder for BlockingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let embed_fn = Arc::clone(&self.embed_fn);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || embed_fn(&text))
            .await
            .map_err(|e| EmbeddingError::Worker(e.to_string()))?
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generator_rejects_empty_text() {
        let generator =
            EmbeddingGenerator::new("ollama", "http://localhost:11434", "all-minilm", None, Some(384), 5)
                .unwrap();
        let err = generator.embed("   ").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::EmptyText));
    }

    #[tokio::test]
    async fn test_unknown_provider_not_implemented() {
        let generator = EmbeddingGenerator::new("bogus", "http://localhost:1", "m", None, None, 5).unwrap();
        let err = generator.embed("beaches").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::NotImplemented(p) if p == "bogus"));
    }

    #[tokio::test]
    async fn test_blocking_embedder_runs_function() {
        let embedder = BlockingEmbedder::new(|text: &str| Ok(vec![text.len() as f32; 3])).with_dimensions(3);
        let embedding = embedder.embed("hoi an").await.unwrap();
        assert_eq!(embedding, vec![6.0; 3]);
        assert_eq!(embedder.dimensions(), Some(3));
    }

    #[test]
    fn test_blocking_embedder_propagates_error() {
        let embedder = BlockingEmbedder::new(|_: &str| Err(EmbeddingError::EmptyText));
        let result = tokio_test::block_on(embedder.embed("x"));
        assert!(matches!(result, Err(EmbeddingError::EmptyText)));
    }
}
