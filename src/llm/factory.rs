

use std::sync::Arc;

use super::embeddings::{Embedder, EmbeddingGenerator};
use super::providers::base::LlmProvider;
use super::providers::openrouter::OpenRouterProvider;
use crate::core::config::TravelRagConfig;
use crate::core::error::{Result, TravelRagError};


pub struct LlmProviderFactory;

impl LlmProviderFactory {

    pub fn from_config(config: &TravelRagConfig) -> Result<Arc<dyn LlmProvider>> {
        match config.llm_provider.as_str() {
            "openrouter" | "openai" => {
                let api_key = config.llm_api_key.clone().ok_or_else(|| {
                    TravelRagError::Config(format!("{} requires an API key", config.llm_provider))
                })?;
                Ok(Arc::new(OpenRouterProvider::new(
                    api_key,
                    config.llm_base_url.clone(),
                    config.llm_model.clone(),
                    config.llm_temperature,
                    config.llm_max_tokens,
                    config.timeout,
                )?))
            }
            other => Err(TravelRagError::Config(format!(
                "Unknown LLM provider: {other}. Supported: openrouter, openai"
            ))),
        }
    }
}


pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {

    pub fn from_config(config: &TravelRagConfig) -> Result<Arc<dyn Embedder>> {
        let generator = EmbeddingGenerator::new(
            config.embedding_provider.clone(),
            config.embedding_url.clone(),
            config.embedding_model.clone(),
            config.embedding_api_key.clone(),
            Some(config.embedding_dimensions),
            config.timeout,
        )
        .map_err(|e| TravelRagError::Config(format!("Embedding client setup failed: {e}")))?;
        Ok(Arc::new(generator))
    }
}
