

pub mod client;
pub mod memory;
pub mod neo4j;
pub mod pinecone;

pub use client::{Credentials, StoreClient, StoreClientOptions, StoreError};
pub use memory::{InMemoryGraph, InMemoryVectorIndex, TravelDataset};
pub use neo4j::Neo4jGraph;
pub use pinecone::PineconeIndex;
