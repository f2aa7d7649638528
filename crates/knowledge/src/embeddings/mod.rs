//! Embedding providers: `Embed(text) -> vector`.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbedderSettings, EmbeddingProvider, DEFAULT_MOCK_DIMENSIONS};
pub use providers::{MockEmbedder, OllamaEmbedder, OpenAiEmbedder};
