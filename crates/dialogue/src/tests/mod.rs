//! Crate-level scenario tests.


use crate::assistant::Assistant;
use crate::types::{ChatRequest, ChatResponse, RequestContext};
use pitlane_core::config::AppConfig;
use pitlane_core::AppResult;
use pitlane_knowledge::{KnowledgeSnapshot, MemorySource, MockEmbedder};
use pitlane_llm::MockClient;
use std::sync::Arc;

pub(crate) const SAMPLE: &str = include_str!("../../../../demos/knowledge.json");

pub(crate) const ADMIN_TOKEN: &str = "pit-wall-secret";

pub(crate) fn sample_snapshot() -> KnowledgeSnapshot {
    KnowledgeSnapshot::parse(SAMPLE).unwrap()
}

pub(crate) fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.provider = "mock".to_string();
    config.model = "mock".to_string();
    config.knowledge.source = Some("memory".to_string());
    config.admin_token = Some(ADMIN_TOKEN.to_string());
    config
}

pub(crate) struct Harness {
    pub assistant: Assistant,
    pub source: Arc<MemorySource>,
    pub generator: Arc<MockClient>,
}

impl Harness {
    pub fn new(config: AppConfig, generator: MockClient) -> Self {
        let source = Arc::new(MemorySource::new(SAMPLE));
        let generator = Arc::new(generator);
        let assistant = Assistant::new(
            &config,
            source.clone(),
            Arc::new(MockEmbedder::new(256)),
            generator.clone(),
        )
        .unwrap();

        Self {
            assistant,
            source,
            generator,
        }
    }

    /// A harness whose knowledge is already loaded.
    pub async fn ready(generator: MockClient) -> Self {
        let harness = Self::new(test_config(), generator);
        harness.assistant.init().await;
        harness
    }

    pub async fn ask(&self, session: &str, query: &str) -> AppResult<ChatResponse> {
        self.assistant
            .handle(
                ChatRequest::new(query).with_session(session),
                &RequestContext::default(),
            )
            .await
    }
}
