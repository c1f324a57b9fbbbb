//! Hybrid retrieval: embed, vector search, then best-effort graph expansion.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use super::config::{RetrievalConfig, RetrievalRequest};
use super::models::Retrieval;
use super::phases::{graph_expansion_phase, vector_search_phase};
use super::ports::{GraphTraversalPort, VectorSearchPort};
use crate::core::cache::{Embedding, EmbeddingCache};
use crate::core::error::{Result, RetrievalStage, TravelRagError};
use crate::llm::embeddings::Embedder;


pub struct RetrievalOrchestrator {
    embedder: Arc<dyn Embedder>,
    cache: Arc<EmbeddingCache>,
    vector: Arc<dyn VectorSearchPort>,
    graph: Arc<dyn GraphTraversalPort>,
    config: RetrievalConfig,
}

impl RetrievalOrchestrator {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorSearchPort>,
        graph: Arc<dyn GraphTraversalPort>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            cache: Arc::new(EmbeddingCache::new()),
            vector,
            graph,
            config,
        }
    }

    /// Shares an existing cache, e.g. between orchestrators over different stores.
    pub fn with_cache(mut self, cache: Arc<EmbeddingCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Runs one hybrid retrieval for `query`.
    ///
    /// Embedding and vector search are mandatory: their failures and
    /// deadline expiry fail the call. Graph expansion is best-effort and
    /// degrades to an empty related set with `degraded` set.
    pub async fn retrieve(&self, query: &str, request: &RetrievalRequest) -> Result<Retrieval> {
        let request_id = Uuid::new_v4();
        let span = info_span!("retrieve", %request_id);
        self.retrieve_inner(request_id, query, request).instrument(span).await
    }

    async fn retrieve_inner(&self, request_id: Uuid, query: &str, request: &RetrievalRequest) -> Result<Retrieval> {
        if query.trim().is_empty() {
            return Err(TravelRagError::InvalidArgument("query must not be empty".to_string()));
        }

        let top_k = request.top_k.unwrap_or(self.config.top_k);
        if top_k > self.config.max_top_k {
            return Err(TravelRagError::InvalidArgument(format!(
                "top_k {} exceeds the maximum of {}",
                top_k, self.config.max_top_k
            )));
        }
        if top_k == 0 {
            debug!("top_k is 0, skipping retrieval");
            return Ok(Retrieval::empty(request_id));
        }

        let started = Instant::now();
        info!("Retrieving for: '{}' (top_k={})", crate::safe_truncate(query, 50), top_k);

        let embedding = self.embed(query, request).await?;

        let result = vector_search_phase(
            self.vector.as_ref(),
            &embedding,
            top_k,
            request.stage_deadline(self.config.vector_timeout),
        )
        .await?;

        if result.is_empty() {
            info!("No vector matches, skipping graph expansion");
            return Ok(Retrieval {
                result,
                ..Retrieval::empty(request_id)
            });
        }

        let seed_count = request.related_seed_count.unwrap_or(self.config.related_seed_count);
        let seeds = result.seed_ids(seed_count);
        let outcome = graph_expansion_phase(
            self.graph.as_ref(),
            &seeds,
            request.stage_deadline(self.config.graph_timeout),
        )
        .await;

        info!(
            "Retrieval complete: {} results, {} related, degraded={} in {:?}",
            result.len(),
            outcome.related.len(),
            outcome.degraded,
            started.elapsed()
        );

        Ok(Retrieval {
            request_id,
            result,
            related: outcome.related,
            degraded: outcome.degraded,
            note: outcome.note,
        })
    }

    async fn embed(&self, query: &str, request: &RetrievalRequest) -> Result<Embedding> {
        let started = Instant::now();
        let deadline = request.stage_deadline(self.config.embedding_timeout);

        let embedder = Arc::clone(&self.embedder);
        let text = query.to_string();
        let lookup = self
            .cache
            .get_or_compute(query, move || async move { embedder.embed(&text).await });

        match tokio::time::timeout_at(deadline, lookup).await {
            Ok(Ok(embedding)) => Ok(embedding),
            Ok(Err(e)) => Err(TravelRagError::embedding(&e)),
            Err(_) => Err(TravelRagError::timeout(RetrievalStage::Embedding, started.elapsed())),
        }
    }
}
