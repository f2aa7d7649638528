//! Knowledge synchronization and retrieval.
//!
//! Fetches the authoritative knowledge document, decomposes it into chunks,
//! embeds them and answers nearest-neighbour queries over the result.

pub mod chunker;
pub mod embeddings;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::ChunkExtractor;
pub use embeddings::{create_provider, EmbedderSettings, EmbeddingProvider, MockEmbedder};
pub use snapshot::KnowledgeSnapshot;
pub use source::{
    create_source, ChangeToken, FetchOutcome, FileSource, HttpSource, KnowledgeSource, MemorySource,
};
pub use store::{Generation, KnowledgeStore};
pub use types::{Chunk, KnowledgeStatus, LoadOutcome, ScoredChunk};
pub use vector_index::{cosine_similarity, VectorEntry, VectorIndex};
