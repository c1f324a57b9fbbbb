

use std::sync::Arc;

use async_trait::async_trait;

use super::models::{RelatedSet, RetrievalResult};
use crate::db::StoreError;


/// Similarity search over item embeddings.
///
/// Implementations return at most `top_k` items (fewer when the index is
/// smaller), never fabricate items, and return an empty result for an empty
/// index. Timeouts are applied by the caller.
#[async_trait]
pub trait VectorSearchPort: Send + Sync {
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<RetrievalResult, StoreError>;

    fn backend_name(&self) -> &str;
}


/// One-hop neighbour lookup in the travel knowledge graph.
///
/// An empty `seed_ids` yields an empty set without touching the store, and
/// no seed id ever appears in the returned set.
#[async_trait]
pub trait GraphTraversalPort: Send + Sync {
    async fn related(&self, seed_ids: &[String]) -> Result<RelatedSet, StoreError>;

    fn backend_name(&self) -> &str;
}


#[async_trait]
impl VectorSearchPort for Arc<dyn VectorSearchPort> {
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<RetrievalResult, StoreError> {
        (**self).search(embedding, top_k).await
    }

    fn backend_name(&self) -> &str {
        (**self).backend_name()
    }
}


#[async_trait]
impl GraphTraversalPort for Arc<dyn GraphTraversalPort> {
    async fn related(&self, seed_ids: &[String]) -> Result<RelatedSet, StoreError> {
        (**self).related(seed_ids).await
    }

    fn backend_name(&self) -> &str {
        (**self).backend_name()
    }
}
