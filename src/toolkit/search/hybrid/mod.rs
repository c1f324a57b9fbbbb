//! Hybrid vector + graph retrieval over the travel knowledge base.

pub mod config;
pub mod models;
pub mod orchestrator;
pub mod phases;
pub mod ports;
pub mod summary;

pub use config::{RetrievalConfig, RetrievalRequest};
pub use models::{
    RelatedItem, RelatedSet, RelationType, Relationship, Retrieval, RetrievalResult, ScoredItem, TravelItem,
};
pub use orchestrator::RetrievalOrchestrator;
pub use ports::{GraphTraversalPort, VectorSearchPort};
pub use summary::{ResultSummarizer, Summary};
