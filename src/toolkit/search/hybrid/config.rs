

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::core::config::TravelRagConfig;


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub related_seed_count: usize,
    pub max_top_k: usize,
    pub embedding_timeout: Duration,
    pub vector_timeout: Duration,
    pub graph_timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            related_seed_count: 3,
            max_top_k: 100,
            embedding_timeout: Duration::from_secs(30),
            vector_timeout: Duration::from_secs(5),
            graph_timeout: Duration::from_secs(3),
        }
    }
}

impl From<&TravelRagConfig> for RetrievalConfig {
    fn from(config: &TravelRagConfig) -> Self {
        Self {
            top_k: config.default_top_k,
            related_seed_count: config.related_seed_count,
            max_top_k: config.max_top_k,
            embedding_timeout: Duration::from_secs(config.timeout),
            vector_timeout: Duration::from_millis(config.vector_timeout_ms),
            graph_timeout: Duration::from_millis(config.graph_timeout_ms),
        }
    }
}


/// Per-call overrides; unset fields fall back to [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrievalRequest {
    pub top_k: Option<usize>,
    pub related_seed_count: Option<usize>,
    pub deadline: Option<Instant>,
}

impl RetrievalRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_related_seed_count(mut self, count: usize) -> Self {
        self.related_seed_count = Some(count);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Earliest of the stage budget starting now and the caller's deadline.
    pub(crate) fn stage_deadline(&self, stage_timeout: Duration) -> Instant {
        let stage_deadline = Instant::now() + stage_timeout;
        match self.deadline {
            Some(deadline) => deadline.min(stage_deadline),
            None => stage_deadline,
        }
    }
}
