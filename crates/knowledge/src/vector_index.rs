//! In-memory vector index over one chunk set.
//!
//! An index is built in full from a chunk list and never mutated afterwards;
//! refresh builds a new one and the store swaps it in.

use crate::embeddings::EmbeddingProvider;
use crate::types::{Chunk, ScoredChunk};
use pitlane_core::{AppError, AppResult};

/// One embedding per chunk.
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub chunk_id: String,
    pub embedding: Vec<f32>,
    pub chunk: Chunk,
}

#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<VectorEntry>,
}

impl VectorIndex {
    /// Embed all chunk texts in one batch and build a complete index.
    ///
    /// # Errors
    /// Returns `AppError::Provider` if embedding fails or the provider
    /// returns a different number of vectors than chunks.
    pub async fn build(embedder: &dyn EmbeddingProvider, chunks: Vec<Chunk>) -> AppResult<Self> {
        if chunks.is_empty() {
            return Ok(Self::default());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(AppError::Provider(format!(
                "Embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorEntry {
                chunk_id: chunk.id.clone(),
                embedding,
                chunk,
            })
            .collect();

        Ok(Self { entries })
    }

    /// Build directly from precomputed entries.
    pub fn from_entries(entries: Vec<VectorEntry>) -> Self {
        Self { entries }
    }

    /// Return at most `k` entries by descending cosine similarity.
    ///
    /// Equal scores keep chunk order.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let score = cosine_similarity(query_embedding, &e.embedding);
                (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();

        // Stable sort keeps insertion order among ties. NaN ranks last.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[VectorEntry] {
        &self.entries
    }
}

/// Cosine similarity; 0 when either norm is zero or dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;

    fn entry(id: &str, embedding: Vec<f32>) -> VectorEntry {
        VectorEntry {
            chunk_id: id.to_string(),
            embedding,
            chunk: Chunk {
                id: id.to_string(),
                text: format!("text for {}", id),
                source_url: "https://apexkarting.example".to_string(),
            },
        }
    }

    #[test]
    fn test_cosine_symmetry_and_self_max() {
        let a = [0.3, -1.2, 2.0, 0.5];
        let b = [1.0, 0.4, -0.1, 2.2];
        assert!((cosine_similarity(&a, &b) - cosine_similarity(&b, &a)).abs() < 1e-6);

        let self_sim = cosine_similarity(&a, &a);
        assert!((self_sim - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &b) <= self_sim);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_search_orders_and_limits() {
        let index = VectorIndex::from_entries(vec![
            entry("far", vec![-1.0, 0.0]),
            entry("near", vec![1.0, 0.1]),
            entry("mid", vec![0.5, 0.5]),
        ]);

        let results = index.search(&[1.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "near");
        assert_eq!(results[1].chunk.id, "mid");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_search_ties_keep_chunk_order() {
        let index = VectorIndex::from_entries(vec![
            entry("first", vec![1.0, 0.0]),
            entry("second", vec![2.0, 0.0]),
            entry("third", vec![0.0, 1.0]),
        ]);

        let ids: Vec<String> = index
            .search(&[1.0, 0.0], 3)
            .into_iter()
            .map(|s| s.chunk.id)
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_search_nan_embedding_ranks_last() {
        let index = VectorIndex::from_entries(vec![
            entry("low", vec![0.0, 1.0]),
            entry("broken", vec![f32::NAN, 1.0]),
            entry("high", vec![1.0, 0.0]),
            entry("mid", vec![1.0, 1.0]),
        ]);

        let results = index.search(&[1.0, 0.0], 4);
        let ids: Vec<&str> = results.iter().map(|s| s.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low", "broken"]);
        assert_eq!(results[3].score, f32::NEG_INFINITY);
    }

    #[test]
    fn test_search_empty_index() {
        assert!(VectorIndex::default().search(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_scores_not_clamped() {
        let index = VectorIndex::from_entries(vec![entry("opposite", vec![-1.0, 0.0])]);
        let results = index.search(&[1.0, 0.0], 1);
        assert!((results[0].score + 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_build_one_batch_per_chunk_set() {
        let embedder = MockEmbedder::new(64);
        let chunks = vec![
            entry("a", vec![]).chunk,
            entry("b", vec![]).chunk,
        ];

        let index = VectorIndex::build(&embedder, chunks).await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(embedder.batch_calls(), 1);
        assert_eq!(index.entries()[1].chunk_id, "b");
    }

    #[derive(Debug)]
    struct ShortEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ShortEmbedder {
        fn provider_name(&self) -> &str {
            "short"
        }
        fn model_name(&self) -> &str {
            "short"
        }
        fn dimensions(&self) -> usize {
            2
        }
        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0, 0.0]])
        }
    }

    #[tokio::test]
    async fn test_build_count_mismatch_is_provider_error() {
        let chunks = vec![entry("a", vec![]).chunk, entry("b", vec![]).chunk];
        let result = VectorIndex::build(&ShortEmbedder, chunks).await;
        assert!(matches!(result, Err(AppError::Provider(_))));
    }
}
