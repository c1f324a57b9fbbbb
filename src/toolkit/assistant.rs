

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use strum::Display;
use tracing::{info, warn};

use crate::core::cache::CacheStats;
use crate::core::config::TravelRagConfig;
use crate::core::error::{Result, TravelRagError};
use crate::db::{Neo4jGraph, PineconeIndex, StoreClientOptions, TravelDataset};
use crate::llm::context::ContextPromptBuilder;
use crate::llm::embeddings::Embedder;
use crate::llm::factory::{EmbeddingProviderFactory, LlmProviderFactory};
use crate::llm::providers::base::{LlmMetadata, LlmProvider};
use crate::toolkit::search::hybrid::{
    ResultSummarizer, RetrievalConfig, RetrievalOrchestrator, RetrievalRequest, Summary,
};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReplyStatus {
    Answered,
    SearchFailed,
    GenerationFailed,
}


#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub query: String,
    pub answer: String,
    /// Absent when retrieval failed.
    pub summary: Option<Summary>,
    pub degraded: bool,
    pub status: ReplyStatus,
    /// Model and token usage of the completion; set only when an answer was generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<LlmMetadata>,
}

impl ChatReply {
    pub fn is_answered(&self) -> bool {
        self.status == ReplyStatus::Answered
    }
}


/// Question answering over hybrid retrieval and a chat-completion model.
pub struct TravelAssistant {
    retriever: RetrievalOrchestrator,
    llm: Arc<dyn LlmProvider>,
    summarizer: ResultSummarizer,
    prompts: ContextPromptBuilder,
    concurrency: usize,
}

impl TravelAssistant {
    pub fn new(retriever: RetrievalOrchestrator, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            retriever,
            llm,
            summarizer: ResultSummarizer::default(),
            prompts: ContextPromptBuilder::default(),
            concurrency: 4,
        }
    }

    pub fn with_prompt_builder(mut self, prompts: ContextPromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Wires Pinecone, Neo4j, the embedding backend and the LLM from `config`.
    pub fn from_config(config: &TravelRagConfig) -> Result<Self> {
        config.validate()?;
        let options = store_options(config);

        let api_key = config
            .pinecone_api_key
            .clone()
            .ok_or_else(|| TravelRagError::Config("PINECONE_API_KEY is required".to_string()))?;
        let vector = PineconeIndex::new(
            &config.pinecone_index_host,
            api_key,
            config.pinecone_namespace.clone(),
            options.clone(),
        )
        .map_err(|e| TravelRagError::Config(format!("Pinecone client setup failed: {e}")))?;

        let graph = Neo4jGraph::new(
            &config.neo4j_uri,
            config.neo4j_user.clone(),
            config.neo4j_password.clone(),
            config.neo4j_database.clone(),
            config.related_per_seed,
            options,
        )
        .map_err(|e| TravelRagError::Config(format!("Neo4j client setup failed: {e}")))?;

        let embedder = EmbeddingProviderFactory::from_config(config)?;
        let llm = LlmProviderFactory::from_config(config)?;

        info!(
            "Travel assistant ready: pinecone={}, neo4j={}, llm={}/{}",
            config.pinecone_index_host,
            config.neo4j_uri,
            llm.provider_name(),
            llm.model_name()
        );

        let retriever = RetrievalOrchestrator::new(
            embedder,
            Arc::new(vector),
            Arc::new(graph),
            RetrievalConfig::from(config),
        );
        Ok(Self::assemble(retriever, llm, config))
    }

    /// Serves `dataset` from in-process stores instead of Pinecone and Neo4j.
    pub async fn local(
        config: &TravelRagConfig,
        dataset: &TravelDataset,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let dimensions = embedder.dimensions().unwrap_or(config.embedding_dimensions);
        let index = dataset.vector_index(embedder.as_ref(), dimensions).await?;
        let graph = dataset.graph(config.related_per_seed);
        info!("Local stores ready: {} vectors, {} graph nodes", index.len(), graph.node_count());

        let retriever = RetrievalOrchestrator::new(
            embedder,
            Arc::new(index),
            Arc::new(graph),
            RetrievalConfig::from(config),
        );
        Ok(Self::assemble(retriever, llm, config))
    }

    fn assemble(retriever: RetrievalOrchestrator, llm: Arc<dyn LlmProvider>, config: &TravelRagConfig) -> Self {
        Self::new(retriever, llm)
            .with_prompt_builder(ContextPromptBuilder::new(
                config.prompt_related_limit,
                config.related_description_chars,
            ))
            .with_concurrency(config.worker_concurrency)
    }


    pub async fn chat(&self, query: &str) -> ChatReply {
        let retrieval = match self.retriever.retrieve(query, &RetrievalRequest::new()).await {
            Ok(retrieval) => retrieval,
            Err(e) => {
                warn!("Search failed for '{}': {}", crate::safe_truncate(query, 50), e);
                return ChatReply {
                    query: query.to_string(),
                    answer: format!("Sorry, I could not complete the search for your question: {e}"),
                    summary: None,
                    degraded: false,
                    status: ReplyStatus::SearchFailed,
                    generation: None,
                };
            }
        };

        let summary = self.summarizer.summarize(&retrieval.result, &retrieval.related);
        info!("SUMMARY: {}", summary);

        let prompt = self.prompts.build(query, &retrieval.result, &retrieval.related, &summary);
        let (answer, status, generation) = match self.llm.generate(&prompt.system, &prompt.user_prompt()).await {
            Ok((answer, metadata)) => {
                if let Some(total) = metadata.total_tokens() {
                    info!("Answer generated by {}/{} using {} tokens", metadata.provider, metadata.model, total);
                }
                (answer, ReplyStatus::Answered, Some(metadata))
            }
            Err(e) => {
                warn!("Response generation failed: {}", e);
                (
                    format!("Sorry, I encountered an error generating the response: {e}"),
                    ReplyStatus::GenerationFailed,
                    None,
                )
            }
        };

        ChatReply {
            query: query.to_string(),
            answer,
            summary: Some(summary),
            degraded: retrieval.degraded,
            status,
            generation,
        }
    }

    /// Answers independent questions concurrently; replies keep input order.
    pub async fn chat_many(&self, queries: Vec<String>) -> Vec<ChatReply> {
        stream::iter(queries)
            .map(|query| async move { self.chat(&query).await })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    pub fn cache_len(&self) -> usize {
        self.retriever.cache().len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.retriever.cache().stats()
    }

    pub fn retriever(&self) -> &RetrievalOrchestrator {
        &self.retriever
    }
}

fn store_options(config: &TravelRagConfig) -> StoreClientOptions {
    StoreClientOptions {
        timeout: std::time::Duration::from_secs(config.timeout),
        max_retries: config.max_retries,
        pool_max_idle_per_host: config.pool_max_idle_per_host,
    }
}
