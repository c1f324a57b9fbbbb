

use tokio::time::Instant;
use tracing::{info, warn};

use super::super::models::RetrievalResult;
use super::super::ports::VectorSearchPort;
use crate::core::error::{Result, RetrievalStage, TravelRagError};


/// Mandatory stage: any failure or deadline expiry fails the retrieval.
pub async fn vector_search_phase(
    port: &dyn VectorSearchPort,
    embedding: &[f32],
    top_k: usize,
    deadline: Instant,
) -> Result<RetrievalResult> {
    let started = Instant::now();

    let result = match tokio::time::timeout_at(deadline, port.search(embedding, top_k)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!("Vector search failed on {}: {}", port.backend_name(), e);
            return Err(TravelRagError::vector_search(&e));
        }
        Err(_) => {
            warn!("Vector search timed out on {}", port.backend_name());
            return Err(TravelRagError::timeout(RetrievalStage::VectorSearch, started.elapsed()));
        }
    };

    // Backends are not trusted to honour ordering, uniqueness or the top_k cap.
    let result = RetrievalResult::from_candidates(result.items().to_vec(), top_k);

    info!("Vector search: {} results in {:?}", result.len(), started.elapsed());
    Ok(result)
}
