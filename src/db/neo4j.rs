

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::client::{Credentials, StoreClient, StoreClientOptions, StoreError};
use crate::toolkit::search::hybrid::{
    GraphTraversalPort, RelatedItem, RelatedSet, RelationType, Relationship, TravelItem,
};


// Directed edges are followed outward only; NEAR_TO is matched in either direction.
const RELATED_ITEMS_QUERY: &str = r#"
UNWIND $seed_ids AS seed_id
CALL {
    WITH seed_id
    MATCH (source:Entity {id: seed_id})-[r]-(target:Entity)
    WHERE (startNode(r) = source OR type(r) = 'NEAR_TO')
      AND NOT target.id IN $seed_ids
    RETURN r, target
    LIMIT $per_seed
}
RETURN seed_id,
       type(r) AS relation,
       target.id AS id,
       target.name AS name,
       coalesce(target.city, target.region) AS city,
       target.type AS type,
       target.description AS description,
       target.tags AS tags
"#;


#[derive(Serialize)]
struct TxRequest<'a> {
    statements: Vec<TxStatement<'a>>,
}

#[derive(Serialize)]
struct TxStatement<'a> {
    statement: &'a str,
    parameters: serde_json::Value,
}

#[derive(Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Deserialize)]
struct TxRow {
    row: RelatedRow,
}

#[derive(Deserialize)]
struct TxError {
    code: String,
    message: String,
}

type RelatedRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<Vec<String>>,
);

fn row_to_related((seed_id, relation, id, name, city, item_type, description, tags): RelatedRow) -> Option<RelatedItem> {
    let Some(id) = id else {
        debug!("Skipping neighbour of {} without an id", seed_id);
        return None;
    };
    let Ok(kind) = RelationType::from_str(&relation) else {
        debug!("Skipping unsupported relation {} from {}", relation, seed_id);
        return None;
    };

    let item = TravelItem {
        id: id.clone(),
        name,
        city,
        item_type,
        description,
        tags: tags.unwrap_or_default(),
    };

    Some(RelatedItem {
        item: Arc::new(item),
        relationship: Relationship::new(seed_id, id, kind),
    })
}


pub struct Neo4jGraph {
    client: StoreClient,
    database: String,
    per_seed: usize,
}

impl Neo4jGraph {

    pub fn new(
        uri: &str,
        user: impl Into<String>,
        password: Option<String>,
        database: impl Into<String>,
        per_seed: usize,
        options: StoreClientOptions,
    ) -> Result<Self, StoreError> {
        let client = StoreClient::new(
            "neo4j",
            uri,
            Credentials::Basic {
                user: user.into(),
                password,
            },
            options,
        )?;
        let database = database.into();
        info!("Neo4j graph ready: {} (db={})", client.base_url(), database);
        Ok(Self {
            client,
            database,
            per_seed,
        })
    }
}

#[async_trait]
impl GraphTraversalPort for Neo4jGraph {
    async fn related(&self, seed_ids: &[String]) -> Result<RelatedSet, StoreError> {
        if seed_ids.is_empty() {
            return Ok(RelatedSet::empty());
        }

        let request = TxRequest {
            statements: vec![TxStatement {
                statement: RELATED_ITEMS_QUERY,
                parameters: json!({
                    "seed_ids": seed_ids,
                    "per_seed": self.per_seed,
                }),
            }],
        };

        let path = format!("/db/{}/tx/commit", self.database);
        let response: TxResponse = self.client.post_json(&path, &request).await?;

        if let Some(error) = response.errors.first() {
            return Err(StoreError::Query(format!("{}: {}", error.code, error.message)));
        }

        let pairs: Vec<RelatedItem> = response
            .results
            .into_iter()
            .flat_map(|result| result.data)
            .filter_map(|row| row_to_related(row.row))
            .collect();

        let related = RelatedSet::from_pairs(pairs, seed_ids);
        debug!("Neo4j: {} seeds -> {} related items", seed_ids.len(), related.len());
        Ok(related)
    }

    fn backend_name(&self) -> &str {
        "neo4j"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(relation: &str, id: Option<&str>) -> RelatedRow {
        (
            "attraction_1".to_string(),
            relation.to_string(),
            id.map(String::from),
            Some("My Khe Beach".to_string()),
            Some("Da Nang".to_string()),
            Some("Beach".to_string()),
            None,
            None,
        )
    }

    #[test]
    fn test_row_maps_to_related_item() {
        let related = row_to_related(row("NEAR_TO", Some("beach_2"))).unwrap();
        assert_eq!(related.item.id, "beach_2");
        assert_eq!(related.item.city(), Some("Da Nang"));
        assert_eq!(related.relationship.kind, RelationType::NearTo);
        assert_eq!(related.relationship.source_id, "attraction_1");
    }

    #[test]
    fn test_row_with_unknown_relation_skipped() {
        assert!(row_to_related(row("RELATED_TO", Some("x"))).is_none());
    }

    #[test]
    fn test_row_without_id_skipped() {
        assert!(row_to_related(row("OFFERS", None)).is_none());
    }

    #[tokio::test]
    async fn test_empty_seeds_skip_store() {
        // Unroutable address: any request would fail.
        let graph = Neo4jGraph::new(
            "http://127.0.0.1:9",
            "neo4j",
            None,
            "neo4j",
            3,
            StoreClientOptions::default(),
        )
        .unwrap();
        let related = graph.related(&[]).await.unwrap();
        assert!(related.is_empty());
    }
}
