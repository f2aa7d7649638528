//! Knowledge store: the live snapshot, its chunks and their vector index.
//!
//! The three are built together into one immutable [`Generation`] and
//! installed with a single pointer swap. Readers clone the `Arc` once and
//! keep using that generation even if a refresh lands mid-request.

use crate::chunker::ChunkExtractor;
use crate::embeddings::EmbeddingProvider;
use crate::snapshot::KnowledgeSnapshot;
use crate::source::{ChangeToken, FetchOutcome, KnowledgeSource};
use crate::types::{KnowledgeStatus, LoadOutcome, ScoredChunk};
use crate::vector_index::VectorIndex;
use pitlane_core::{AppError, AppResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// One mutually consistent snapshot + chunk set + index.
#[derive(Debug)]
pub struct Generation {
    pub snapshot: KnowledgeSnapshot,
    pub index: VectorIndex,
    pub token: ChangeToken,
    /// Load sequence number that produced this generation.
    pub sequence: u64,
}

impl Generation {
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }
}

pub struct KnowledgeStore {
    source: Arc<dyn KnowledgeSource>,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: ChunkExtractor,
    min_relevance_score: Option<f32>,
    current: RwLock<Option<Arc<Generation>>>,
    next_sequence: AtomicU64,
}

impl KnowledgeStore {
    pub fn new(
        source: Arc<dyn KnowledgeSource>,
        embedder: Arc<dyn EmbeddingProvider>,
        extractor: ChunkExtractor,
    ) -> Self {
        Self {
            source,
            embedder,
            extractor,
            min_relevance_score: None,
            current: RwLock::new(None),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Drop hits scoring below `score` after ranking.
    pub fn with_min_relevance_score(mut self, score: Option<f32>) -> Self {
        self.min_relevance_score = score;
        self
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// Fetch the source and install a new generation if it changed.
    ///
    /// With `force = false` the installed change token is sent as a
    /// precondition. On any error the previous generation keeps serving.
    pub async fn load(&self, force: bool) -> AppResult<LoadOutcome> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let precondition = if force {
            None
        } else {
            self.installed().map(|g| g.token.clone())
        };

        let (body, token) = match self.source.fetch(precondition.as_ref()).await? {
            FetchOutcome::NotModified => {
                tracing::info!(source = %self.source.describe(), "Knowledge source not modified");
                return Ok(LoadOutcome::Unchanged);
            }
            FetchOutcome::Body { body, token } => (body, token),
        };

        let snapshot = KnowledgeSnapshot::parse(&body)?;
        let chunks = self.extractor.extract(&snapshot);
        let chunk_count = chunks.len();

        tracing::info!(
            "Rebuilding vector index: {} chunks via {} ({})",
            chunk_count,
            self.embedder.provider_name(),
            self.embedder.model_name()
        );
        let index = VectorIndex::build(self.embedder.as_ref(), chunks).await?;

        let generation = Arc::new(Generation {
            snapshot,
            index,
            token,
            sequence,
        });

        let mut current = self
            .current
            .write()
            .map_err(|_| AppError::Other("Knowledge store lock poisoned".to_string()))?;

        if let Some(ref installed) = *current {
            if installed.sequence > sequence {
                tracing::debug!(
                    "Discarding load #{}: load #{} already installed",
                    sequence,
                    installed.sequence
                );
                return Ok(LoadOutcome::Unchanged);
            }
        }

        *current = Some(generation);
        drop(current);

        tracing::info!("Installed knowledge generation #{} ({} chunks)", sequence, chunk_count);
        Ok(LoadOutcome::Changed)
    }

    /// The live generation, or `NotReady` before the first successful load.
    pub fn current(&self) -> AppResult<Arc<Generation>> {
        self.installed()
            .ok_or_else(|| AppError::NotReady("No knowledge snapshot loaded yet".to_string()))
    }

    fn installed(&self) -> Option<Arc<Generation>> {
        self.current.read().ok().and_then(|g| g.clone())
    }

    /// Rank chunks of `generation` against `query`.
    pub async fn retrieve_in(
        &self,
        generation: &Generation,
        query: &str,
        k: usize,
    ) -> AppResult<Vec<ScoredChunk>> {
        if generation.index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let mut hits = generation.index.search(&query_embedding, k);

        if let Some(min) = self.min_relevance_score {
            hits.retain(|hit| hit.score >= min);
        }

        for hit in &hits {
            tracing::debug!("Retrieved {} (score {:.4})", hit.chunk.id, hit.score);
        }

        Ok(hits)
    }

    /// Rank chunks of the live generation against `query`.
    pub async fn retrieve(&self, query: &str, k: usize) -> AppResult<Vec<ScoredChunk>> {
        let generation = self.current()?;
        self.retrieve_in(&generation, query, k).await
    }

    pub fn status(&self) -> KnowledgeStatus {
        match self.installed() {
            Some(generation) => KnowledgeStatus {
                loaded: true,
                chunk_count: generation.chunk_count(),
            },
            None => KnowledgeStatus {
                loaded: false,
                chunk_count: 0,
            },
        }
    }

    /// Run `load(false)` every `period` until the task is aborted.
    ///
    /// The first tick is skipped; callers do the initial load themselves.
    pub fn spawn_refresh(store: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Knowledge refresh started (every {}s)", period.as_secs());

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            loop {
                interval.tick().await;
                match store.load(false).await {
                    Ok(outcome) => tracing::debug!("Knowledge refresh: {:?}", outcome),
                    Err(e) => tracing::warn!("Knowledge refresh failed: {}", e),
                }
            }
        })
    }
}
