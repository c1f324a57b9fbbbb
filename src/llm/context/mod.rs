

pub mod prompt;

pub use prompt::{ContextPromptBuilder, NO_MATCHES_MARKER, PromptContext, SYSTEM_PROMPT};
