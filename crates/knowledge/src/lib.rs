//! Knowledge base for ragcall.
//!
//! Loads the narrative text source, validates it, and builds the read-only
//! vector index the retrieval gate queries on every user turn.
//!
//! - [`source`]: locating, validating and seeding the source file
//! - [`chunker`]: whitespace-aware overlapping chunks
//! - [`vector`]: cosine similarity and top-k ranking
//! - [`index`]: the [`VectorIndex`] answering queries
//! - [`service`]: the [`RetrievalService`] loader and its lifecycle

pub mod chunker;
pub mod index;
pub mod service;
pub mod source;
pub mod vector;

pub use index::VectorIndex;
pub use service::{IndexBuilder, RetrievalService, ServiceState, VectorIndexBuilder};
pub use source::{KnowledgeSource, SourcePolicy};

#[cfg(test)]
mod test_helpers;
