use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;


#[derive(Error, Debug)]
pub enum LlmProviderError {
    #[error("Completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Completion from {0} contained no choices")]
    EmptyCompletion(String),
}


/// Token counts as reported by an OpenAI-compatible `usage` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}


/// Which model wrote a travel answer and what it cost. Attached to the `ChatReply` it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LlmMetadata {
    pub provider: String,
    pub model: String,
    /// Absent when the endpoint omits the `usage` block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl LlmMetadata {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }

    pub fn total_tokens(&self) -> Option<u32> {
        self.usage.map(|u| u.total_tokens)
    }
}


/// Chat completion backend: the grounding prompt goes in as the system message,
/// the question with its retrieved context as the user message.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<(String, LlmMetadata), LlmProviderError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_omitted_from_json_when_unknown() {
        let metadata = LlmMetadata::new("openrouter", "openai/gpt-4o-mini");
        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json, serde_json::json!({"provider": "openrouter", "model": "openai/gpt-4o-mini"}));
        assert_eq!(metadata.total_tokens(), None);
    }

    #[test]
    fn test_usage_block_deserializes_from_completion_response() {
        let usage: TokenUsage =
            serde_json::from_str(r#"{"prompt_tokens": 120, "completion_tokens": 12, "total_tokens": 132}"#).unwrap();
        let metadata = LlmMetadata::new("openrouter", "m").with_usage(Some(usage));

        assert_eq!(metadata.total_tokens(), Some(132));
    }
}
