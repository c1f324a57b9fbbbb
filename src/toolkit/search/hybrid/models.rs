

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;
use uuid::Uuid;


/// A place, attraction, hotel or activity known to the vector index and graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TravelItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TravelItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    // Blank metadata counts as missing.
    pub fn city(&self) -> Option<&str> {
        non_blank(self.city.as_deref())
    }

    pub fn item_type(&self) -> Option<&str> {
        non_blank(self.item_type.as_deref())
    }

    pub fn description(&self) -> Option<&str> {
        non_blank(self.description.as_deref())
    }

    pub fn display_name(&self) -> &str {
        non_blank(self.name.as_deref()).unwrap_or(&self.id)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    pub item: Arc<TravelItem>,
    pub score: f32,
}

impl ScoredItem {
    pub fn new(item: Arc<TravelItem>, score: f32) -> Self {
        Self { item, score }
    }

    pub fn id(&self) -> &str {
        &self.item.id
    }
}


/// Top-k hits ordered by descending score, each item id at most once.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RetrievalResult {
    items: Vec<ScoredItem>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Orders candidates by score, keeps the best hit per id and caps at `top_k`.
    pub fn from_candidates(candidates: Vec<ScoredItem>, top_k: usize) -> Self {
        let mut candidates: Vec<ScoredItem> = candidates
            .into_iter()
            .filter(|c| {
                let finite = c.score.is_finite();
                if !finite {
                    debug!("Dropping candidate {} with non-finite score", c.id());
                }
                finite
            })
            .collect();
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut seen: HashSet<String> = HashSet::new();
        let items: Vec<ScoredItem> = candidates
            .into_iter()
            .filter(|c| seen.insert(c.item.id.clone()))
            .take(top_k)
            .collect();

        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredItem> {
        self.items.iter()
    }

    pub fn items(&self) -> &[ScoredItem] {
        &self.items
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|s| s.item.id == id)
    }

    /// Identifiers of the first `count` hits, used as graph traversal seeds.
    pub fn seed_ids(&self, count: usize) -> Vec<String> {
        self.items.iter().take(count).map(|s| s.item.id.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a RetrievalResult {
    type Item = &'a ScoredItem;
    type IntoIter = std::slice::Iter<'a, ScoredItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    LocatedIn,
    NearTo,
    Offers,
    SuitableFor,
}

impl RelationType {
    /// NEAR_TO holds in both directions; the others point from source to target.
    pub fn is_symmetric(self) -> bool {
        matches!(self, Self::NearTo)
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub source_id: String,
    pub target_id: String,
    pub kind: RelationType,
}

impl Relationship {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, kind: RelationType) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
        }
    }

    /// Whether this edge connects the two ids, respecting direction for directed kinds.
    pub fn connects(&self, from: &str, to: &str) -> bool {
        (self.source_id == from && self.target_id == to)
            || (self.kind.is_symmetric() && self.source_id == to && self.target_id == from)
    }
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedItem {
    pub item: Arc<TravelItem>,
    pub relationship: Relationship,
}


/// Items one hop away from the seeds, unique by id and never containing a seed.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RelatedSet {
    items: Vec<RelatedItem>,
}

impl RelatedSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: Vec<RelatedItem>, seed_ids: &[String]) -> Self {
        let mut seen: HashSet<String> = seed_ids.iter().cloned().collect();
        let items = pairs
            .into_iter()
            .filter(|pair| seen.insert(pair.item.id.clone()))
            .collect();
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RelatedItem> {
        self.items.iter()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|r| r.item.id == id)
    }
}

impl<'a> IntoIterator for &'a RelatedSet {
    type Item = &'a RelatedItem;
    type IntoIter = std::slice::Iter<'a, RelatedItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}


/// Outcome of one hybrid retrieval.
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    pub request_id: Uuid,
    pub result: RetrievalResult,
    pub related: RelatedSet,
    /// Set when graph enrichment failed or timed out and `related` was left empty.
    pub degraded: bool,
    pub note: Option<String>,
}

impl Retrieval {
    pub fn empty(request_id: Uuid) -> Self {
        Self {
            request_id,
            result: RetrievalResult::empty(),
            related: RelatedSet::empty(),
            degraded: false,
            note: None,
        }
    }
}
