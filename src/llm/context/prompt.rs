

use serde::Serialize;

use crate::toolkit::search::hybrid::{RelatedSet, RetrievalResult, Summary};


pub const SYSTEM_PROMPT: &str = r#"You are a helpful Vietnam travel assistant with access to semantic search and knowledge graph data.

Follow this chain of thought:
1. ANALYZE: What type of travel experience is the user seeking?
2. MATCH: Which locations from the search results best fit their needs?
3. CONNECT: What related places or activities enhance the experience?
4. RECOMMEND: Provide specific, actionable suggestions with reasoning.

Be specific, cite actual places, and explain why each recommendation fits their query."#;


/// Emitted in place of the match listing when retrieval found nothing.
pub const NO_MATCHES_MARKER: &str = "[NO MATCHING ITEMS FOUND]";


/// Everything the language model sees for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptContext {
    pub system: String,
    pub context: String,
    pub query: String,
}

impl PromptContext {
    pub fn user_prompt(&self) -> String {
        format!(
            "{}\n\nUser query: {}\n\nBased on the above context, provide a helpful response with specific recommendations.",
            self.context, self.query
        )
    }
}


#[derive(Debug, Clone)]
pub struct ContextPromptBuilder {
    related_limit: usize,
    description_chars: usize,
}

impl Default for ContextPromptBuilder {
    fn default() -> Self {
        Self {
            related_limit: 10,
            description_chars: 200,
        }
    }
}

impl ContextPromptBuilder {
    pub fn new(related_limit: usize, description_chars: usize) -> Self {
        Self {
            related_limit,
            description_chars,
        }
    }

    pub fn build(
        &self,
        query: &str,
        result: &RetrievalResult,
        related: &RelatedSet,
        summary: &Summary,
    ) -> PromptContext {
        let mut sections = vec![format!("Search summary: {summary}")];

        if result.is_empty() {
            sections.push(format!(
                "Top semantic matches:\n{NO_MATCHES_MARKER}\nNo places in the knowledge base matched this question. \
                 Say so and suggest how the traveller could rephrase it."
            ));
        } else {
            let matches = result
                .iter()
                .map(|scored| {
                    let item = &scored.item;
                    format!(
                        "- [{}] {} ({}) in {} [similarity: {:.3}]: {}",
                        item.id,
                        item.display_name(),
                        item.item_type().unwrap_or("unknown type"),
                        item.city().unwrap_or("Vietnam"),
                        scored.score,
                        self.describe(item.description())
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("Top semantic matches:\n{matches}"));
        }

        if related.is_empty() {
            sections.push("Related places and connections:\n(none)".to_string());
        } else {
            let mut lines: Vec<String> = related
                .iter()
                .take(self.related_limit)
                .map(|r| {
                    format!(
                        "- {} ({} from {}): {}",
                        r.item.display_name(),
                        r.relationship.kind,
                        r.relationship.source_id,
                        self.describe(r.item.description())
                    )
                })
                .collect();
            if related.len() > self.related_limit {
                lines.push(format!("... and {} more", related.len() - self.related_limit));
            }
            sections.push(format!("Related places and connections:\n{}", lines.join("\n")));
        }

        PromptContext {
            system: SYSTEM_PROMPT.to_string(),
            context: sections.join("\n\n"),
            query: query.to_string(),
        }
    }

    fn describe(&self, description: Option<&str>) -> String {
        match description {
            Some(text) => crate::safe_truncate_ellipsis(text, self.description_chars),
            None => "no description".to_string(),
        }
    }
}
