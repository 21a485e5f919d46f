//! Data types shared by the scraper, the splitter and the stores.

pub mod chunk;
pub mod filter;
pub mod link;
pub mod page;

pub use chunk::{
    chunk_id, sanitize_metadata, ChunkMetadata, EmbeddedChunk, MetadataValue, PolicyChunk,
    ScoredChunk,
};
pub use filter::MetadataFilter;
pub use link::PolicyLink;
pub use page::PolicyPage;
