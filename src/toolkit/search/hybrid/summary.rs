

use std::fmt;

use serde::Serialize;

use super::models::{RelatedSet, RetrievalResult};
use crate::utils::pluralize;


/// One-sentence digest of a retrieval, recomputed for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary(String);

impl Summary {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}


#[derive(Debug, Clone)]
pub struct ResultSummarizer {
    max_cities_named: usize,
}

impl Default for ResultSummarizer {
    fn default() -> Self {
        Self { max_cities_named: 3 }
    }
}

impl ResultSummarizer {
    pub fn new(max_cities_named: usize) -> Self {
        Self { max_cities_named }
    }

    pub fn summarize(&self, result: &RetrievalResult, related: &RelatedSet) -> Summary {
        if result.is_empty() {
            return Summary("Found 0 places.".to_string());
        }

        let mut cities: Vec<&str> = Vec::new();
        let mut types: Vec<&str> = Vec::new();
        for scored in result {
            if let Some(city) = scored.item.city() {
                if !cities.contains(&city) {
                    cities.push(city);
                }
            }
            if let Some(item_type) = scored.item.item_type() {
                if !types.contains(&item_type) {
                    types.push(item_type);
                }
            }
        }

        let mut summary = format!("Found {}", pluralize(result.len(), "place", "places"));
        if !cities.is_empty() {
            let named: Vec<&str> = cities.iter().take(self.max_cities_named).copied().collect();
            summary.push_str(&format!(
                " across {} ({})",
                pluralize(cities.len(), "city", "cities"),
                named.join(", ")
            ));
        }
        if !types.is_empty() {
            summary.push_str(&format!(" including {}", types.join(", ")));
        }
        if !related.is_empty() {
            summary.push_str(&format!(
                " with {}",
                pluralize(related.len(), "related connection", "related connections")
            ));
        }
        summary.push('.');

        Summary(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{beach_items, related_items, scored_result};
    use crate::toolkit::search::hybrid::TravelItem;

    #[test]
    fn test_beach_scenario_summary() {
        let result = scored_result(beach_items());
        let related = related_items(8);

        let summary = ResultSummarizer::default().summarize(&result, &related);
        assert_eq!(
            summary.as_str(),
            "Found 5 places across 3 cities (Da Nang, Nha Trang, Phu Quoc) including Beach, Activity with 8 related connections."
        );
    }

    #[test]
    fn test_empty_result_summary() {
        let summary = ResultSummarizer::default().summarize(&RetrievalResult::empty(), &related_items(2));
        assert_eq!(summary.to_string(), "Found 0 places.");
    }

    #[test]
    fn test_missing_metadata_is_skipped() {
        let result = scored_result(vec![
            TravelItem::new("a"),
            TravelItem::new("b").with_type("Hotel"),
        ]);
        let summary = ResultSummarizer::default().summarize(&result, &RelatedSet::empty());
        assert_eq!(summary.as_str(), "Found 2 places including Hotel.");
    }

    #[test]
    fn test_only_first_three_cities_named() {
        let result = scored_result(
            ["Hanoi", "Hue", "Hoi An", "Sapa"]
                .iter()
                .enumerate()
                .map(|(i, city)| TravelItem::new(format!("c{i}")).with_city(*city))
                .collect(),
        );
        let summary = ResultSummarizer::default().summarize(&result, &RelatedSet::empty());
        assert_eq!(summary.as_str(), "Found 4 places across 4 cities (Hanoi, Hue, Hoi An).");
    }

    #[test]
    fn test_single_item_uses_singular_nouns() {
        let result = scored_result(vec![TravelItem::new("a").with_city("Hue").with_type("Temple")]);
        let summary = ResultSummarizer::default().summarize(&result, &related_items(1));
        assert_eq!(summary.as_str(), "Found 1 place across 1 city (Hue) including Temple with 1 related connection.");
    }

    #[test]
    fn test_summary_is_deterministic() {
        let result = scored_result(beach_items());
        let related = related_items(3);
        let summarizer = ResultSummarizer::default();
        assert_eq!(summarizer.summarize(&result, &related), summarizer.summarize(&result, &related));
    }
}
