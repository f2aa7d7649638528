//! Retrieval context and generation prompt assembly.

use crate::session::Session;
use crate::types::SourceRef;
use pitlane_core::config::AnswerSettings;
use pitlane_core::AppResult;
use pitlane_knowledge::{Generation, KnowledgeStore, ScoredChunk};
use pitlane_llm::{ChatMessage, LlmClient, LlmRequest, Role};
use pitlane_prompt::{build_prompt, InstructionDefinition, Pipeline};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

pub struct AnswerComposer {
    instructions: InstructionDefinition,
    pipeline: Pipeline,
    settings: AnswerSettings,
    generator: Arc<dyn LlmClient>,
    model: String,
}

impl AnswerComposer {
    pub fn new(
        instructions: InstructionDefinition,
        settings: AnswerSettings,
        generator: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            instructions,
            pipeline: Pipeline::standard(&settings.currency_symbol),
            settings,
            generator,
            model: model.into(),
        }
    }

    /// Retrieve chunks for `query`, folding in the last few user turns.
    pub async fn build_context(
        &self,
        store: &KnowledgeStore,
        generation: &Generation,
        query: &str,
        session: &Session,
    ) -> AppResult<Vec<ScoredChunk>> {
        let mut parts = session.recent_user_turns(self.settings.context_turns);
        parts.push(query);
        let retrieval_query = parts.join("\n");

        store
            .retrieve_in(generation, &retrieval_query, self.settings.top_k)
            .await
    }

    /// Messages for the generator: instructions, recent turns, then the
    /// query with its context and output rules.
    pub fn build_messages(
        &self,
        generation: &Generation,
        session: &Session,
        query: &str,
        hits: &[ScoredChunk],
    ) -> AppResult<Vec<ChatMessage>> {
        let snapshot = &generation.snapshot;

        let mut variables = HashMap::new();
        variables.insert("siteName".to_string(), snapshot.site.name.clone());
        variables.insert("siteUrl".to_string(), snapshot.site.base_url.clone());
        variables.insert(
            "currencySymbol".to_string(),
            self.settings.currency_symbol.clone(),
        );
        if let Some(ref track) = session.slots.track {
            let name = snapshot
                .track(track)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| track.clone());
            variables.insert("track".to_string(), name);
        }
        if let Some(ref day) = session.slots.day {
            variables.insert("day".to_string(), day.clone());
        }
        variables.insert("query".to_string(), query.to_string());
        variables.insert("context".to_string(), format_context(hits));

        let built = build_prompt(&self.instructions, variables)?;

        let history_len = self.settings.context_turns * 2;
        let skip = session.turns.len().saturating_sub(history_len);

        let mut messages = Vec::with_capacity(history_len + 2);
        messages.push(ChatMessage::system(built.system));
        for turn in session.turns.iter().skip(skip) {
            messages.push(match turn.role {
                Role::Assistant => ChatMessage::assistant(turn.text.clone()),
                _ => ChatMessage::user(turn.text.clone()),
            });
        }
        messages.push(ChatMessage::user(built.user));
        Ok(messages)
    }

    /// Generate and post-process an answer. Failures are not retried.
    pub async fn compose(
        &self,
        generation: &Generation,
        session: &Session,
        query: &str,
        hits: &[ScoredChunk],
    ) -> AppResult<Answer> {
        let messages = self.build_messages(generation, session, query, hits)?;
        let request = LlmRequest::new(messages, self.model.clone())
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        let response = self.generator.complete(&request).await?;
        tracing::debug!(
            "Generated {} chars via {}",
            response.content.len(),
            self.generator.provider_name()
        );

        Ok(Answer {
            text: self.pipeline.apply(&response.content),
            sources: sources_of(hits),
        })
    }
}

/// Numbered snippets with their source URLs.
pub fn format_context(hits: &[ScoredChunk]) -> String {
    if hits.is_empty() {
        return "(no matching information)".to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] {}\nSource: {}", i + 1, hit.chunk.text, hit.chunk.source_url))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Unique sources in rank order.
pub fn sources_of(hits: &[ScoredChunk]) -> Vec<SourceRef> {
    let mut seen = HashSet::new();
    hits.iter()
        .filter(|hit| seen.insert(hit.chunk.id.clone()))
        .map(|hit| SourceRef {
            id: hit.chunk.id.clone(),
            url: hit.chunk.source_url.clone(),
        })
        .collect()
}
