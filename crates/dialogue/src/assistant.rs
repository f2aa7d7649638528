//! The assistant service: knowledge, sessions, policy and composer behind
//! one request entry point with an explicit lifecycle.

use crate::composer::{Answer, AnswerComposer};
use crate::policy::{DialoguePolicy, Route};
use crate::session::{Session, SessionStore};
use crate::types::{ChatRequest, ChatResponse, RequestContext};
use chrono::{Local, NaiveDate};
use pitlane_core::config::AppConfig;
use pitlane_core::{AppError, AppResult};
use pitlane_knowledge::{
    create_provider, create_source, ChunkExtractor, EmbedderSettings, EmbeddingProvider,
    Generation, KnowledgeSource, KnowledgeStatus, KnowledgeStore, LoadOutcome,
};
use pitlane_llm::{create_client, LlmClient, Role};
use pitlane_prompt::load_instructions;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subtle::ConstantTimeEq;
use tokio::task::JoinHandle;

pub struct Assistant {
    store: Arc<KnowledgeStore>,
    sessions: Arc<SessionStore>,
    policy: DialoguePolicy,
    composer: AnswerComposer,
    admin_token: Option<String>,
    refresh_interval: Duration,
    sweep_interval: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Assistant {
    /// Wire an assistant from explicit collaborators.
    ///
    /// Nothing is fetched until [`Assistant::init`].
    pub fn new(
        config: &AppConfig,
        source: Arc<dyn KnowledgeSource>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn LlmClient>,
    ) -> AppResult<Self> {
        config.validate_limits()?;

        let instructions = load_instructions(config.answer.prompt_path.as_deref())?;
        tracing::debug!("Using instructions {}", instructions.id);

        let extractor = ChunkExtractor::new(&config.answer.currency_symbol);
        let store = KnowledgeStore::new(source, embedder, extractor)
            .with_min_relevance_score(config.knowledge.min_relevance_score);

        let sessions = SessionStore::new(
            Duration::from_secs(config.sessions.idle_timeout_secs),
            config.sessions.max_turns,
        );

        Ok(Self {
            store: Arc::new(store),
            sessions: Arc::new(sessions),
            policy: DialoguePolicy::new(&config.dialogue),
            composer: AnswerComposer::new(
                instructions,
                config.answer.clone(),
                generator,
                config.model.clone(),
            ),
            admin_token: config.admin_token.clone(),
            refresh_interval: Duration::from_secs(config.knowledge.refresh_interval_secs),
            sweep_interval: Duration::from_secs(config.sessions.sweep_interval_secs),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Build every collaborator from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let location = config.knowledge.source.as_deref().unwrap_or_default();
        let source = create_source(location)?;

        let embedding_provider = config.embedding_provider();
        let embedding_config = config.get_provider_config(&embedding_provider);
        let embedder = create_provider(&EmbedderSettings {
            provider: embedding_provider.clone(),
            model: embedding_config
                .as_ref()
                .and_then(|pc| pc.embedding_model())
                .map(str::to_string),
            dimensions: embedding_config.as_ref().and_then(|pc| pc.dimensions()),
            endpoint: embedding_config
                .as_ref()
                .and_then(|pc| pc.endpoint())
                .map(str::to_string),
            api_key: config.resolve_api_key(&embedding_provider),
        })?;

        let generation_config = config.get_provider_config(&config.provider);
        let api_key = config.resolve_api_key(&config.provider);
        let generator = create_client(
            &config.provider,
            generation_config.as_ref().and_then(|pc| pc.endpoint()),
            api_key.as_deref(),
        )?;

        tracing::info!(
            "Assistant wired: source {}, embeddings {}/{}, generation {}/{}",
            source.describe(),
            embedder.provider_name(),
            embedder.model_name(),
            generator.provider_name(),
            config.model
        );

        Self::new(config, source, embedder, generator)
    }

    /// First load, then the background refresh and sweep tasks.
    ///
    /// A failed first load is logged; requests answer `NotReady` until a
    /// later refresh succeeds.
    pub async fn init(&self) {
        if self.tasks.lock().map(|t| !t.is_empty()).unwrap_or(false) {
            return;
        }

        match self.store.load(false).await {
            Ok(outcome) => tracing::info!(
                "Initial knowledge load from {}: {:?}",
                self.store.source_description(),
                outcome
            ),
            Err(e) => tracing::warn!(
                "Initial knowledge load from {} failed: {}",
                self.store.source_description(),
                e
            ),
        }

        let refresh = KnowledgeStore::spawn_refresh(self.store.clone(), self.refresh_interval);
        let sweeper = SessionStore::spawn_sweeper(self.sessions.clone(), self.sweep_interval);

        match self.tasks.lock() {
            Ok(mut tasks) => tasks.extend([refresh, sweeper]),
            Err(poisoned) => poisoned.into_inner().extend([refresh, sweeper]),
        }
    }

    /// Stop the background tasks.
    pub fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        if !handles.is_empty() {
            tracing::info!("Stopping {} background tasks", handles.len());
        }
        for handle in handles {
            handle.abort();
        }
    }

    /// Answer one request.
    pub async fn handle(
        &self,
        request: ChatRequest,
        ctx: &RequestContext,
    ) -> AppResult<ChatResponse> {
        self.handle_on(request, ctx, Local::now().date_naive()).await
    }

    /// Answer one request, resolving relative days against `today`.
    pub async fn handle_on(
        &self,
        request: ChatRequest,
        ctx: &RequestContext,
        today: NaiveDate,
    ) -> AppResult<ChatResponse> {
        let query = request
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::Validation("A non-empty query is required".to_string()))?
            .to_string();

        let generation = self.store.current()?;

        let session_id = self.sessions.identify(request.session_id.as_deref(), ctx);
        let mut session = self.sessions.get_or_create(&session_id);

        let route = self
            .policy
            .decide(&query, &mut session.slots, &generation.snapshot, today);

        let (text, sources) = match route {
            Route::FastAnswer { text, sources } => {
                tracing::debug!("Session {}: fast answer", session_id);
                (text, sources)
            }
            Route::Clarify { question } => {
                tracing::debug!("Session {}: clarifying", session_id);
                (question, Vec::new())
            }
            Route::Generate => {
                let generated = self.generate(&generation, &session, &query).await;
                match generated {
                    Ok(answer) => (answer.text, answer.sources),
                    Err(e) => {
                        tracing::warn!("Session {}: answer failed: {}", session_id, e);
                        self.sessions.append_turn(&mut session, Role::User, query);
                        self.sessions.commit(session);
                        return Err(e);
                    }
                }
            }
        };

        self.sessions.append_turn(&mut session, Role::User, query);
        self.sessions
            .append_turn(&mut session, Role::Assistant, text.clone());
        self.sessions.commit(session);

        Ok(ChatResponse {
            response: text,
            sources,
            session_id,
        })
    }

    async fn generate(
        &self,
        generation: &Generation,
        session: &Session,
        query: &str,
    ) -> AppResult<Answer> {
        let hits = self
            .composer
            .build_context(&self.store, generation, query, session)
            .await?;
        tracing::debug!(
            "Retrieved {} chunks (top score {:.3})",
            hits.len(),
            hits.first().map(|h| h.score).unwrap_or(0.0)
        );
        self.composer.compose(generation, session, query, &hits).await
    }

    pub fn status(&self) -> KnowledgeStatus {
        self.store.status()
    }

    /// Force a knowledge reload. Requires the configured admin token.
    pub async fn reload(&self, credential: Option<&str>) -> AppResult<LoadOutcome> {
        let Some(expected) = self.admin_token.as_deref() else {
            return Err(AppError::Unauthorized(
                "No admin token is configured".to_string(),
            ));
        };

        let given = credential.unwrap_or_default();
        if !bool::from(given.as_bytes().ct_eq(expected.as_bytes())) {
            tracing::warn!("Rejected reload with a bad credential");
            return Err(AppError::Unauthorized("Invalid admin token".to_string()));
        }

        tracing::info!("Forced reload from {}", self.store.source_description());
        self.store.load(true).await
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

impl Drop for Assistant {
    fn drop(&mut self) {
        self.shutdown();
    }
}
