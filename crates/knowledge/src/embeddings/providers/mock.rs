//! Deterministic offline embedder.

use crate::embeddings::provider::EmbeddingProvider;
use pitlane_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "on", "a", "an", "are", "was", "for", "to", "of", "in", "and", "or",
    "with", "by", "from", "this", "that", "be", "have", "has", "it", "its", "you", "your", "can",
    "do", "does", "what", "how", "we", "our", "i", "me", "my",
];

/// Hashes word trigrams and whole words into a fixed number of buckets.
///
/// Not semantic, but texts that share vocabulary land close together, which
/// is enough for ranking tests and for running without a model server.
#[derive(Debug)]
pub struct MockEmbedder {
    dimensions: usize,
    batch_calls: AtomicUsize,
    failing: AtomicBool,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            batch_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Number of `embed_batch` calls made so far.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent calls fail with a provider error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        let lower = text.to_lowercase();
        let mut word_freq: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let idx = bucket(window.iter().collect::<String>().as_bytes(), 37, self.dimensions);
                embedding[idx] += (*freq as f32).sqrt();
            }
            embedding[bucket(word.as_bytes(), 31, self.dimensions)] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }
        embedding
    }
}

fn bucket(bytes: &[u8], multiplier: u64, dimensions: usize) -> usize {
    let hash = bytes
        .iter()
        .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(*b as u64));
    (hash % dimensions as u64) as usize
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Provider("mock embedder failure".to_string()));
        }
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_embed_batch_shape_and_norm() {
        let provider = MockEmbedder::new(128);
        let texts = vec!["Mile End track".to_string(), "Junior prices".to_string()];
        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 128);
            assert!((norm(embedding) - 1.0).abs() < 0.001);
        }
        assert_eq!(provider.batch_calls(), 1);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = MockEmbedder::new(128);
        let a = provider.embed("laps per session").await.unwrap();
        let b = provider.embed("laps per session").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, provider.embed("opening hours").await.unwrap());
    }

    #[tokio::test]
    async fn test_stop_words_only_is_zero_vector() {
        let provider = MockEmbedder::new(32);
        let embedding = provider.embed("what is the").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_failing_switch() {
        let provider = MockEmbedder::new(32);
        provider.set_failing(true);
        assert!(matches!(
            provider.embed("anything").await,
            Err(AppError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn test_non_ascii_text() {
        let provider = MockEmbedder::new(64);
        let embedding = provider.embed("Prix en €, café über Straße").await.unwrap();
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }
}
