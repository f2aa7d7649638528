//! Embedding provider trait and factory.

use super::providers::{MockEmbedder, OllamaEmbedder, OpenAiEmbedder};
use pitlane_core::{AppError, AppResult};
use std::sync::Arc;

/// Default dimensions for the deterministic mock embedder.
pub const DEFAULT_MOCK_DIMENSIONS: usize = 384;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    ///
    /// Implementations return exactly one vector per input text, in order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Provider("No embedding returned".to_string()))
    }
}

/// Settings needed to build an embedding provider.
#[derive(Debug, Clone, Default)]
pub struct EmbedderSettings {
    pub provider: String,
    pub model: Option<String>,
    pub dimensions: Option<usize>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

/// Create an embedding provider from settings.
pub fn create_provider(settings: &EmbedderSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "mock" => {
            let dimensions = settings.dimensions.unwrap_or(DEFAULT_MOCK_DIMENSIONS);
            Ok(Arc::new(MockEmbedder::new(dimensions)))
        }

        "ollama" => Ok(Arc::new(OllamaEmbedder::new(
            settings.endpoint.as_deref(),
            settings.model.as_deref(),
            settings.dimensions,
        )?)),

        "openai" => {
            let key = settings.api_key.as_deref().ok_or_else(|| {
                AppError::Config("OpenAI embedding provider requires API key".to_string())
            })?;
            Ok(Arc::new(OpenAiEmbedder::new(
                key,
                settings.endpoint.as_deref(),
                settings.model.as_deref(),
                settings.dimensions,
            )?))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama, openai",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> EmbedderSettings {
        EmbedderSettings {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&EmbedderSettings {
            dimensions: Some(64),
            ..settings("mock")
        })
        .unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 64);
    }

    #[test]
    fn test_create_ollama_provider() {
        let provider = create_provider(&settings("ollama")).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_openai_requires_key() {
        assert!(create_provider(&settings("openai")).is_err());
        let provider = create_provider(&EmbedderSettings {
            api_key: Some("sk-test".to_string()),
            ..settings("openai")
        })
        .unwrap();
        assert_eq!(provider.provider_name(), "openai");
    }

    #[test]
    fn test_create_unknown_provider() {
        let result = create_provider(&settings("gguf"));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&settings("mock")).unwrap();
        let embedding = provider.embed("helmet sizes").await.unwrap();
        assert_eq!(embedding.len(), DEFAULT_MOCK_DIMENSIONS);
    }
}
