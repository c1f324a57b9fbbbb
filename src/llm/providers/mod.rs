

pub mod base;
pub mod openrouter;

pub use base::{LlmMetadata, LlmProvider, LlmProviderError, TokenUsage};
pub use openrouter::OpenRouterProvider;
