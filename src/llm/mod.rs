

pub mod context;
pub mod embeddings;
pub mod factory;
pub mod providers;

pub use context::{ContextPromptBuilder, PromptContext};
pub use embeddings::{BlockingEmbedder, Embedder, EmbeddingError, EmbeddingGenerator};
pub use factory::{EmbeddingProviderFactory, LlmProviderFactory};
pub use providers::{LlmProvider, LlmProviderError};
