//! Shared types for retrieval.

use serde::{Deserialize, Serialize};

/// A self-contained passage derived from the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Stable identifier, e.g. "track:mile_end:schedule"
    pub id: String,
    pub text: String,
    pub source_url: String,
}

/// A chunk with its similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// What a load attempt did to the installed knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A new generation was installed.
    Changed,
    /// The source reported no change, or a newer load already won.
    Unchanged,
}

/// Readiness report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeStatus {
    pub loaded: bool,
    pub chunk_count: usize,
}
