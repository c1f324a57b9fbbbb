

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::client::{Credentials, StoreClient, StoreClientOptions, StoreError};
use crate::toolkit::search::hybrid::{RetrievalResult, ScoredItem, TravelItem, VectorSearchPort};


#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<MatchMetadata>,
}

#[derive(Deserialize, Default)]
struct MatchMetadata {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default, rename = "type")]
    item_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl QueryMatch {
    fn into_scored(self) -> ScoredItem {
        let metadata = self.metadata.unwrap_or_default();
        let item = TravelItem {
            // Uploaded vectors carry the node id in both places; prefer the metadata copy.
            id: metadata.id.unwrap_or(self.id),
            name: metadata.name,
            city: metadata.city,
            item_type: metadata.item_type,
            description: metadata.description,
            tags: metadata.tags,
        };
        ScoredItem::new(Arc::new(item), self.score)
    }
}


pub struct PineconeIndex {
    client: StoreClient,
    namespace: Option<String>,
}

impl PineconeIndex {

    pub fn new(
        index_host: &str,
        api_key: impl Into<String>,
        namespace: Option<String>,
        options: StoreClientOptions,
    ) -> Result<Self, StoreError> {
        let client = StoreClient::new(
            "pinecone",
            index_host,
            Credentials::Header {
                name: "Api-Key",
                value: api_key.into(),
            },
            options,
        )?;
        info!("Pinecone index ready: {}", client.base_url());
        Ok(Self { client, namespace })
    }
}

#[async_trait]
impl VectorSearchPort for PineconeIndex {
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<RetrievalResult, StoreError> {
        if top_k == 0 {
            return Err(StoreError::InvalidArgument("top_k must be at least 1".to_string()));
        }

        let request = QueryRequest {
            vector: embedding,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };

        let response: QueryResponse = self.client.post_json("/query", &request).await?;
        let candidates: Vec<ScoredItem> = response.matches.into_iter().map(QueryMatch::into_scored).collect();

        debug!("Pinecone returned {} matches", candidates.len());
        Ok(RetrievalResult::from_candidates(candidates, top_k))
    }

    fn backend_name(&self) -> &str {
        "pinecone"
    }
}
