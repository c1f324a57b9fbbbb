//! Fixtures and stub collaborators shared by unit tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::db::{InMemoryGraph, InMemoryVectorIndex, StoreError};
use crate::llm::embeddings::{Embedder, EmbeddingError};
use crate::llm::providers::base::{LlmMetadata, LlmProvider, LlmProviderError, TokenUsage};
use crate::toolkit::search::hybrid::{
    GraphTraversalPort, RelatedItem, RelatedSet, RelationType, Relationship, RetrievalResult, ScoredItem,
    TravelItem, VectorSearchPort,
};


/// Bag-of-words hashing embedder: deterministic, counts its calls.
pub struct HashEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
    delay: Duration,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let slot = (hasher.finish() % self.dimensions as u64) as usize;
            vector[slot] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.vector_for(text))
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }
}


pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::InvalidResponse("embedding model unavailable".to_string()))
    }
}


pub struct FailingVectorSearch;

#[async_trait]
impl VectorSearchPort for FailingVectorSearch {
    async fn search(&self, _embedding: &[f32], _top_k: usize) -> Result<RetrievalResult, StoreError> {
        Err(StoreError::Connection("vector index unreachable".to_string()))
    }

    fn backend_name(&self) -> &str {
        "failing"
    }
}


pub struct SlowVectorSearch(pub Duration);

#[async_trait]
impl VectorSearchPort for SlowVectorSearch {
    async fn search(&self, _embedding: &[f32], _top_k: usize) -> Result<RetrievalResult, StoreError> {
        tokio::time::sleep(self.0).await;
        Ok(RetrievalResult::empty())
    }

    fn backend_name(&self) -> &str {
        "slow"
    }
}


/// Graph store that fails (or hangs) and counts how often it was asked.
pub struct FailingGraph {
    pub calls: AtomicUsize,
    pub hang: Option<Duration>,
}

impl FailingGraph {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            hang: None,
        }
    }

    pub fn hanging(duration: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            hang: Some(duration),
        }
    }
}

#[async_trait]
impl GraphTraversalPort for FailingGraph {
    async fn related(&self, _seed_ids: &[String]) -> Result<RelatedSet, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(duration) = self.hang {
            tokio::time::sleep(duration).await;
        }
        Err(StoreError::Connection("graph store unreachable".to_string()))
    }

    fn backend_name(&self) -> &str {
        "failing"
    }
}


pub struct StubLlm {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl StubLlm {
    pub fn answering() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    async fn generate(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LlmProviderError::Provider("rate limited".to_string()));
        }
        let query_line = user_prompt
            .lines()
            .find(|line| line.starts_with("User query:"))
            .unwrap_or_default();
        let usage = TokenUsage {
            prompt_tokens: user_prompt.split_whitespace().count() as u32,
            completion_tokens: 4,
            total_tokens: user_prompt.split_whitespace().count() as u32 + 4,
        };
        let metadata = LlmMetadata::new(self.provider_name(), self.model_name()).with_usage(Some(usage));
        Ok((format!("Recommendation based on: {query_line}"), metadata))
    }

    fn provider_name(&self) -> &str {
        "stub"
    }

    fn model_name(&self) -> &str {
        "stub-model"
    }
}


/// Five coastal picks spanning three cities and two item types.
pub fn beach_items() -> Vec<TravelItem> {
    vec![
        TravelItem::new("beach_my_khe")
            .with_name("My Khe Beach")
            .with_city("Da Nang")
            .with_type("Beach")
            .with_description("Long sandy beach with calm morning water")
            .with_tags(["beach", "swimming"]),
        TravelItem::new("activity_danang_surf")
            .with_name("Da Nang Surf School")
            .with_city("Da Nang")
            .with_type("Activity")
            .with_description("Beginner surfing lessons")
            .with_tags(["surfing", "water sports"]),
        TravelItem::new("beach_tran_phu")
            .with_name("Tran Phu Beach")
            .with_city("Nha Trang")
            .with_type("Beach")
            .with_description("City beach lined with cafes"),
        TravelItem::new("activity_hon_mun_dive")
            .with_name("Hon Mun Diving")
            .with_city("Nha Trang")
            .with_type("Activity")
            .with_description("Coral reef dives in a marine park"),
        TravelItem::new("beach_sao")
            .with_name("Sao Beach")
            .with_city("Phu Quoc")
            .with_type("Beach")
            .with_description("White sand and turquoise water"),
    ]
}


/// Keeps input order by assigning strictly decreasing scores.
pub fn scored_result(items: Vec<TravelItem>) -> RetrievalResult {
    let count = items.len();
    let scored = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| ScoredItem::new(Arc::new(item), 0.95 - i as f32 * 0.05))
        .collect();
    RetrievalResult::from_candidates(scored, count)
}


pub fn related_items(count: usize) -> RelatedSet {
    let pairs = (0..count)
        .map(|i| {
            let id = format!("related_{i}");
            RelatedItem {
                item: Arc::new(
                    TravelItem::new(id.clone())
                        .with_name(format!("Related Place {i}"))
                        .with_city("Da Nang")
                        .with_type("Restaurant"),
                ),
                relationship: Relationship::new("beach_my_khe", id, RelationType::NearTo),
            }
        })
        .collect();
    RelatedSet::from_pairs(pairs, &[])
}


/// Vector index and graph over [`beach_items`], embedded with `embedder`.
pub async fn beach_stores(embedder: &HashEmbedder) -> (InMemoryVectorIndex, InMemoryGraph) {
    let index = InMemoryVectorIndex::new(embedder.dimensions);
    let mut graph = InMemoryGraph::new(3);

    for item in beach_items() {
        let text = format!(
            "{} {} {}",
            item.display_name(),
            item.item_type().unwrap_or_default(),
            item.description().unwrap_or_default()
        );
        graph.add_item(item.clone());
        index.upsert(item, embedder.vector_for(&text)).unwrap();
    }

    graph.add_item(
        TravelItem::new("city_danang")
            .with_name("Da Nang")
            .with_city("Da Nang")
            .with_type("City"),
    );
    graph.add_item(
        TravelItem::new("hotel_seaside")
            .with_name("Seaside Hotel")
            .with_city("Da Nang")
            .with_type("Hotel"),
    );
    graph.add_edge(Relationship::new("beach_my_khe", "city_danang", RelationType::LocatedIn));
    graph.add_edge(Relationship::new("hotel_seaside", "beach_my_khe", RelationType::NearTo));
    graph.add_edge(Relationship::new("activity_danang_surf", "city_danang", RelationType::LocatedIn));

    (index, graph)
}
