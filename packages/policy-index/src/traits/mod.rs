//! Core trait abstractions.
//!
//! - [`Embedder`]: text to vectors
//! - [`MetadataEnricher`]: LLM-generated metadata for a chunk
//! - [`ChunkStore`]: vector storage and search

pub mod embedder;
pub mod enricher;
pub mod store;

pub use embedder::Embedder;
pub use enricher::MetadataEnricher;
pub use store::{cosine_similarity, maximal_marginal_relevance, ChunkStore};
