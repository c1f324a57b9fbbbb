

pub mod graph;
pub mod vector;

pub use graph::{GraphOutcome, graph_expansion_phase};
pub use vector::vector_search_phase;
