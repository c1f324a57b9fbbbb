

use strum::{Display, IntoStaticStr};
use thiserror::Error;

use crate::db::StoreError;
use crate::llm::embeddings::EmbeddingError;
use crate::llm::providers::base::LlmProviderError;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RetrievalStage {
    Embedding,
    VectorSearch,
    GraphTraversal,
}


#[derive(Error, Debug)]
pub enum TravelRagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Embedding failure: {0}")]
    Embedding(String),

    #[error("Vector search failure: {message}")]
    VectorSearch { message: String, retriable: bool },

    #[error("Graph traversal failure: {message}")]
    GraphTraversal { message: String, retriable: bool },

    #[error("Timed out during {stage} after {elapsed_ms}ms")]
    Timeout { stage: RetrievalStage, elapsed_ms: u64 },

    #[error("LLM provider error: {0}")]
    LlmProvider(#[from] LlmProviderError),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TravelRagError {
    pub fn timeout(stage: RetrievalStage, elapsed: std::time::Duration) -> Self {
        Self::Timeout {
            stage,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Wraps a store failure from the mandatory vector stage.
    pub fn vector_search(err: &StoreError) -> Self {
        Self::VectorSearch {
            message: err.to_string(),
            retriable: err.is_retriable(),
        }
    }

    /// Wraps a store failure from the best-effort graph stage; callers absorb it.
    pub fn graph_traversal(err: &StoreError) -> Self {
        Self::GraphTraversal {
            message: err.to_string(),
            retriable: err.is_retriable(),
        }
    }

    pub fn embedding(err: &EmbeddingError) -> Self {
        Self::Embedding(err.to_string())
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::VectorSearch { retriable, .. } | Self::GraphTraversal { retriable, .. } => *retriable,
            _ => false,
        }
    }
}


pub type Result<T> = std::result::Result<T, TravelRagError>;
