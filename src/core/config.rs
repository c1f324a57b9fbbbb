

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use super::error::{Result, TravelRagError};


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelRagConfig {

    pub pinecone_api_key: Option<String>,
    pub pinecone_index_host: String,
    pub pinecone_namespace: Option<String>,


    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: Option<String>,
    pub neo4j_database: String,


    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_temperature: f64,
    pub llm_max_tokens: u32,


    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_dimensions: usize,


    pub timeout: u64,
    pub max_retries: u32,
    pub pool_max_idle_per_host: usize,


    pub default_top_k: usize,
    pub max_top_k: usize,
    pub related_seed_count: usize,
    pub related_per_seed: usize,
    pub related_description_chars: usize,
    pub prompt_related_limit: usize,
    pub vector_timeout_ms: u64,
    pub graph_timeout_ms: u64,
    pub worker_concurrency: usize,
}

impl TravelRagConfig {

    pub fn new(pinecone_index_host: &str, neo4j_uri: &str) -> Self {
        Self {
            pinecone_api_key: None,
            pinecone_index_host: pinecone_index_host.to_string(),
            pinecone_namespace: None,

            neo4j_uri: neo4j_uri.to_string(),
            neo4j_user: "neo4j".to_string(),
            neo4j_password: None,
            neo4j_database: "neo4j".to_string(),

            llm_provider: "openrouter".to_string(),
            llm_model: crate::DEFAULT_LLM_MODEL.to_string(),
            llm_api_key: None,
            llm_base_url: "https://openrouter.ai/api/v1".to_string(),
            llm_temperature: 0.2,
            llm_max_tokens: 600,

            embedding_provider: "ollama".to_string(),
            embedding_model: crate::DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            embedding_api_key: None,
            embedding_dimensions: crate::EMBEDDING_DIM,

            timeout: 30,
            max_retries: 3,
            pool_max_idle_per_host: 8,

            default_top_k: 5,
            max_top_k: 100,
            related_seed_count: 3,
            related_per_seed: 3,
            related_description_chars: 200,
            prompt_related_limit: 10,
            vector_timeout_ms: 5_000,
            graph_timeout_ms: 3_000,
            worker_concurrency: 4,
        }
    }


    pub fn from_env() -> Self {
        let mut config = Self::new(
            &std::env::var("PINECONE_INDEX_HOST")
                .unwrap_or_else(|_| "https://vietnam-travel.svc.pinecone.io".to_string()),
            &std::env::var("NEO4J_URI").unwrap_or_else(|_| "http://127.0.0.1:7474".to_string()),
        );

        if let Ok(key) = std::env::var("PINECONE_API_KEY") {
            config.pinecone_api_key = Some(key);
        }
        if let Ok(namespace) = std::env::var("PINECONE_NAMESPACE") {
            config.pinecone_namespace = Some(namespace);
        }
        if let Ok(user) = std::env::var("NEO4J_USER") {
            config.neo4j_user = user;
        }
        if let Ok(password) = std::env::var("NEO4J_PASSWORD") {
            config.neo4j_password = Some(password);
        }
        if let Ok(database) = std::env::var("NEO4J_DATABASE") {
            config.neo4j_database = database;
        }
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            config.llm_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("OPENROUTER_BASE_URL") {
            config.llm_base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(url) = std::env::var("EMBEDDING_URL") {
            config.embedding_url = url;
        }
        if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
            config.embedding_api_key = Some(key);
        }

        config.default_top_k = parse_env_or("TRAVEL_RAG_TOP_K", config.default_top_k);
        config.related_seed_count = parse_env_or("TRAVEL_RAG_RELATED_SEEDS", config.related_seed_count);
        config.vector_timeout_ms = parse_env_or("TRAVEL_RAG_VECTOR_TIMEOUT_MS", config.vector_timeout_ms);
        config.graph_timeout_ms = parse_env_or("TRAVEL_RAG_GRAPH_TIMEOUT_MS", config.graph_timeout_ms);
        config.worker_concurrency = parse_env_or("TRAVEL_RAG_CONCURRENCY", config.worker_concurrency);

        config
    }

    /// Rejects malformed endpoints and out-of-range tuning values.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("pinecone_index_host", &self.pinecone_index_host),
            ("neo4j_uri", &self.neo4j_uri),
            ("llm_base_url", &self.llm_base_url),
            ("embedding_url", &self.embedding_url),
        ] {
            Url::parse(value)
                .map_err(|e| TravelRagError::Config(format!("{name} is not a valid URL ({value}): {e}")))?;
        }

        if self.max_top_k == 0 {
            return Err(TravelRagError::Config("max_top_k must be at least 1".to_string()));
        }
        if self.default_top_k > self.max_top_k {
            return Err(TravelRagError::Config(format!(
                "default_top_k {} exceeds max_top_k {}",
                self.default_top_k, self.max_top_k
            )));
        }
        if self.worker_concurrency == 0 {
            return Err(TravelRagError::Config("worker_concurrency must be at least 1".to_string()));
        }
        if self.embedding_dimensions == 0 {
            return Err(TravelRagError::Config("embedding_dimensions must be at least 1".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            return Err(TravelRagError::Config(format!(
                "llm_temperature {} outside 0.0..=2.0",
                self.llm_temperature
            )));
        }

        Ok(())
    }
}

impl Default for TravelRagConfig {
    fn default() -> Self {
        Self::new("https://vietnam-travel.svc.pinecone.io", "http://127.0.0.1:7474")
    }
}

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = TravelRagConfig::default();
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.related_seed_count, 3);
        assert_eq!(config.related_per_seed, 3);
        assert_eq!(config.embedding_dimensions, 384);
        assert_eq!(config.llm_max_tokens, 600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = TravelRagConfig::default();
        config.neo4j_uri = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("neo4j_uri"));
    }

    #[test]
    fn test_validate_rejects_top_k_over_cap() {
        let mut config = TravelRagConfig::default();
        config.default_top_k = config.max_top_k + 1;
        assert!(matches!(config.validate(), Err(TravelRagError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = TravelRagConfig::default();
        config.worker_concurrency = 0;
        assert!(config.validate().is_err());
    }
}
