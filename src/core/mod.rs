

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStats, Embedding, EmbeddingCache};
pub use config::TravelRagConfig;
pub use error::{Result, RetrievalStage, TravelRagError};
