

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::base::{LlmMetadata, LlmProvider, LlmProviderError, TokenUsage};

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}


/// OpenAI-compatible chat completions (OpenRouter by default).
pub struct OpenRouterProvider {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    client: Client,
}

impl OpenRouterProvider {

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, LlmProviderError> {
        let model = model.into();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("OpenRouter provider initialized (model={}, base_url={})", model, base_url);
        Ok(Self {
            api_key: api_key.into(),
            base_url,
            model,
            temperature,
            max_tokens,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()?,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!("Chat completion request: {} prompt chars", system_prompt.len() + user_prompt.len());

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(LlmProviderError::Http)?
            .json::<ChatResponse>()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmProviderError::EmptyCompletion(self.model.clone()))?
            .message
            .content;

        if let Some(usage) = &response.usage {
            debug!("Completion used {} tokens ({} prompt)", usage.total_tokens, usage.prompt_tokens);
        }
        let metadata = LlmMetadata::new(self.provider_name(), &self.model).with_usage(response.usage);
        Ok((content, metadata))
    }

    fn provider_name(&self) -> &str {
        "openrouter"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
