//! In-process vector index and knowledge graph for local runs and tests.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::client::StoreError;
use crate::core::error::{Result, TravelRagError};
use crate::llm::embeddings::Embedder;
use crate::toolkit::search::hybrid::{
    GraphTraversalPort, RelatedItem, RelatedSet, RelationType, Relationship, RetrievalResult, ScoredItem,
    TravelItem, VectorSearchPort,
};

const SEMANTIC_TEXT_CHARS: usize = 1000;
const DATASET_EMBED_CONCURRENCY: usize = 8;


struct IndexEntry {
    item: Arc<TravelItem>,
    vector: Vec<f32>,
    norm: f32,
}


/// Brute-force cosine similarity index.
pub struct InMemoryVectorIndex {
    dimensions: usize,
    entries: RwLock<Vec<IndexEntry>>,
}

impl InMemoryVectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Inserts or replaces the vector for `item.id`.
    pub fn upsert(&self, item: TravelItem, vector: Vec<f32>) -> std::result::Result<(), StoreError> {
        if vector.len() != self.dimensions {
            return Err(StoreError::InvalidArgument(format!(
                "vector for {} has {} dimensions, index expects {}",
                item.id,
                vector.len(),
                self.dimensions
            )));
        }

        let entry = IndexEntry {
            norm: l2_norm(&vector),
            item: Arc::new(item),
            vector,
        };

        let mut entries = self.entries.write();
        match entries.iter_mut().find(|e| e.item.id == entry.item.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[async_trait]
impl VectorSearchPort for InMemoryVectorIndex {
    async fn search(&self, embedding: &[f32], top_k: usize) -> std::result::Result<RetrievalResult, StoreError> {
        if top_k == 0 {
            return Err(StoreError::InvalidArgument("top_k must be at least 1".to_string()));
        }
        if embedding.len() != self.dimensions {
            return Err(StoreError::InvalidArgument(format!(
                "query has {} dimensions, index expects {}",
                embedding.len(),
                self.dimensions
            )));
        }

        let query_norm = l2_norm(embedding);
        let candidates: Vec<ScoredItem> = self
            .entries
            .read()
            .iter()
            .map(|entry| {
                let score = cosine(embedding, query_norm, &entry.vector, entry.norm);
                ScoredItem::new(Arc::clone(&entry.item), score)
            })
            .collect();

        Ok(RetrievalResult::from_candidates(candidates, top_k))
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}


/// Adjacency-list knowledge graph.
pub struct InMemoryGraph {
    items: HashMap<String, Arc<TravelItem>>,
    edges: Vec<Relationship>,
    per_seed: usize,
}

impl InMemoryGraph {
    pub fn new(per_seed: usize) -> Self {
        Self {
            items: HashMap::new(),
            edges: Vec::new(),
            per_seed,
        }
    }

    pub fn add_item(&mut self, item: TravelItem) {
        self.items.insert(item.id.clone(), Arc::new(item));
    }

    pub fn add_edge(&mut self, relationship: Relationship) {
        if !self.edges.contains(&relationship) {
            self.edges.push(relationship);
        }
    }

    pub fn node_count(&self) -> usize {
        self.items.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn neighbours<'a>(&'a self, seed: &'a str) -> impl Iterator<Item = RelatedItem> + 'a {
        self.edges
            .iter()
            .filter_map(move |edge| {
                let neighbour = if edge.source_id == seed {
                    &edge.target_id
                } else if edge.kind.is_symmetric() && edge.target_id == seed {
                    &edge.source_id
                } else {
                    return None;
                };
                let item = self.items.get(neighbour)?;
                Some(RelatedItem {
                    item: Arc::clone(item),
                    relationship: Relationship::new(seed, neighbour.clone(), edge.kind),
                })
            })
    }
}

#[async_trait]
impl GraphTraversalPort for InMemoryGraph {
    async fn related(&self, seed_ids: &[String]) -> std::result::Result<RelatedSet, StoreError> {
        if seed_ids.is_empty() {
            return Ok(RelatedSet::empty());
        }

        let pairs: Vec<RelatedItem> = seed_ids
            .iter()
            .flat_map(|seed| {
                self.neighbours(seed)
                    .filter(|pair| !seed_ids.contains(&pair.item.id))
                    .take(self.per_seed)
            })
            .collect();

        Ok(RelatedSet::from_pairs(pairs, seed_ids))
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}


#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConnection {
    #[serde(default)]
    pub relation: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}


#[derive(Debug, Clone, Deserialize)]
pub struct DatasetNode {
    pub id: String,
    #[serde(default, rename = "type")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub semantic_text: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub connections: Vec<DatasetConnection>,
}

impl DatasetNode {
    pub fn to_item(&self) -> TravelItem {
        TravelItem {
            id: self.id.clone(),
            name: self.name.clone(),
            city: self.city.clone().or_else(|| self.region.clone()),
            item_type: self.node_type.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Text to embed: explicit semantic text, else the start of the description.
    pub fn semantic_text(&self) -> Option<String> {
        let text = match self.semantic_text.as_deref() {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => crate::safe_truncate(self.description.as_deref().unwrap_or(""), SEMANTIC_TEXT_CHARS),
        };
        (!text.trim().is_empty()).then_some(text)
    }
}


/// Travel node list as exported for the vector index and graph uploads.
#[derive(Debug, Clone)]
pub struct TravelDataset {
    nodes: Vec<DatasetNode>,
}

impl TravelDataset {
    pub fn from_json(json: &str) -> Result<Self> {
        let nodes: Vec<DatasetNode> = serde_json::from_str(json)?;
        Ok(Self { nodes })
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let dataset = Self::from_json(&json)
            .map_err(|e| TravelRagError::Dataset(format!("{}: {}", path.display(), e)))?;
        info!("Loaded {} travel nodes from {}", dataset.nodes.len(), path.display());
        Ok(dataset)
    }

    pub fn nodes(&self) -> &[DatasetNode] {
        &self.nodes
    }

    pub fn graph(&self, per_seed: usize) -> InMemoryGraph {
        let mut graph = InMemoryGraph::new(per_seed);
        for node in &self.nodes {
            graph.add_item(node.to_item());
        }

        let mut skipped = 0usize;
        for node in &self.nodes {
            for connection in &node.connections {
                let (Some(relation), Some(target)) = (&connection.relation, &connection.target) else {
                    skipped += 1;
                    continue;
                };
                match RelationType::from_str(relation) {
                    Ok(kind) => graph.add_edge(Relationship::new(node.id.clone(), target.clone(), kind)),
                    Err(_) => skipped += 1,
                }
            }
        }

        if skipped > 0 {
            warn!("Skipped {} connections with missing fields or unsupported relation types", skipped);
        }
        info!("Graph built: {} nodes, {} edges", graph.node_count(), graph.edge_count());
        graph
    }

    /// Embeds every node that has text and loads it into a fresh index.
    pub async fn vector_index(&self, embedder: &dyn Embedder, dimensions: usize) -> Result<InMemoryVectorIndex> {
        let index = InMemoryVectorIndex::new(dimensions);

        let embedded: Vec<(TravelItem, Vec<f32>)> = stream::iter(
            self.nodes
                .iter()
                .filter_map(|node| node.semantic_text().map(|text| (node, text))),
        )
        .map(|(node, text)| async move {
            embedder
                .embed(&text)
                .await
                .map(|vector| (node.to_item(), vector))
                .map_err(|e| TravelRagError::embedding(&e))
        })
        .buffered(DATASET_EMBED_CONCURRENCY)
        .try_collect()
        .await?;

        for (item, vector) in embedded {
            index
                .upsert(item, vector)
                .map_err(|e| TravelRagError::Dataset(e.to_string()))?;
        }

        debug!("Vector index loaded with {} of {} nodes", index.len(), self.nodes.len());
        Ok(index)
    }
}
