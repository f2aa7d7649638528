//! Crate-level scenario tests.


use crate::chunker::ChunkExtractor;
use crate::embeddings::MockEmbedder;
use crate::source::KnowledgeSource;
use crate::store::KnowledgeStore;
use std::sync::Arc;

pub(crate) fn store_with(
    source: Arc<dyn KnowledgeSource>,
) -> (Arc<KnowledgeStore>, Arc<MockEmbedder>) {
    let embedder = Arc::new(MockEmbedder::new(256));
    let store = KnowledgeStore::new(source, embedder.clone(), ChunkExtractor::default());
    (Arc::new(store), embedder)
}
