

use tokio::time::Instant;
use tracing::{info, warn};

use super::super::models::RelatedSet;
use super::super::ports::GraphTraversalPort;
use crate::core::error::{RetrievalStage, TravelRagError};


#[derive(Debug, Clone, Default)]
pub struct GraphOutcome {
    pub related: RelatedSet,
    pub degraded: bool,
    pub note: Option<String>,
}

impl GraphOutcome {
    /// The absorbed failure survives only as the diagnostic note.
    fn degraded(err: TravelRagError) -> Self {
        Self {
            related: RelatedSet::empty(),
            degraded: true,
            note: Some(err.to_string()),
        }
    }
}


/// Best-effort stage: failures and deadline expiry degrade to an empty set.
pub async fn graph_expansion_phase(
    port: &dyn GraphTraversalPort,
    seed_ids: &[String],
    deadline: Instant,
) -> GraphOutcome {
    if seed_ids.is_empty() {
        return GraphOutcome::default();
    }

    let started = Instant::now();

    match tokio::time::timeout_at(deadline, port.related(seed_ids)).await {
        Ok(Ok(related)) => {
            let related = RelatedSet::from_pairs(related.iter().cloned().collect(), seed_ids);
            info!("Graph expansion: {} seeds -> {} related in {:?}", seed_ids.len(), related.len(), started.elapsed());
            GraphOutcome {
                related,
                degraded: false,
                note: None,
            }
        }
        Ok(Err(e)) => {
            warn!("Graph traversal failed on {}, continuing without related items: {}", port.backend_name(), e);
            GraphOutcome::degraded(TravelRagError::graph_traversal(&e))
        }
        Err(_) => {
            warn!("Graph traversal timed out on {} after {:?}", port.backend_name(), started.elapsed());
            GraphOutcome::degraded(TravelRagError::timeout(RetrievalStage::GraphTraversal, started.elapsed()))
        }
    }
}
