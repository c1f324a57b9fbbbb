

pub mod core;
pub mod db;
pub mod llm;
pub mod toolkit;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use utils::{safe_truncate, safe_truncate_ellipsis};


pub use core::cache::EmbeddingCache;
pub use core::config::TravelRagConfig;
pub use core::error::{Result, RetrievalStage, TravelRagError};
pub use llm::context::{ContextPromptBuilder, PromptContext};
pub use llm::embeddings::{Embedder, EmbeddingGenerator};
pub use toolkit::assistant::{ChatReply, ReplyStatus, TravelAssistant};
pub use toolkit::search::hybrid::{
    GraphTraversalPort, ResultSummarizer, Retrieval, RetrievalOrchestrator, RetrievalRequest, VectorSearchPort,
};


pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";


pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-3.5-turbo";


pub const EMBEDDING_DIM: usize = 384;
