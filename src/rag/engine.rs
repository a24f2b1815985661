//! Query orchestration: retrieve → rerank → compose → generate → record.
//!
//! Exchanges on the same session run one at a time; different sessions run
//! in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::reranker::{rerank, Reranker};
use super::store::DocumentStore;
use crate::context::compose_prompt;
use crate::core::config::RagSettings;
use crate::core::errors::ApiError;
use crate::history::{SessionHistoryStore, Turn};
use crate::llm::AnswerGenerator;

/// Reserved query text that clears the session instead of being answered.
pub const RESET_COMMAND: &str = "RESET_CHAT";
pub const HISTORY_CLEARED_ANSWER: &str = "Chat history cleared.";
pub const NO_MATCHES_ANSWER: &str = "I couldn't find any matching food items in my database.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Answered,
    NoMatches,
    HistoryCleared,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct AnswerResponse {
    pub kind: AnswerKind,
    pub answer: String,
    pub sources: Vec<Source>,
    /// True when `answer` is a substituted generation-failure message.
    pub generation_failed: bool,
}

impl AnswerResponse {
    fn without_sources(kind: AnswerKind, answer: &str) -> Self {
        Self {
            kind,
            answer: answer.to_string(),
            sources: Vec::new(),
            generation_failed: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub top_k: usize,
    pub rerank_top_n: usize,
    pub history_exchanges: usize,
    pub record_failed_generations: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&RagSettings::default())
    }
}

impl From<&RagSettings> for EngineConfig {
    fn from(settings: &RagSettings) -> Self {
        Self {
            top_k: settings.top_k,
            rerank_top_n: settings.rerank_top_n,
            history_exchanges: settings.history_exchanges,
            record_failed_generations: settings.record_failed_generations,
        }
    }
}

pub struct RagEngine {
    documents: Arc<dyn DocumentStore>,
    reranker: Arc<dyn Reranker>,
    generator: Arc<dyn AnswerGenerator>,
    history: Arc<dyn SessionHistoryStore>,
    config: EngineConfig,
    session_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RagEngine {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        reranker: Arc<dyn Reranker>,
        generator: Arc<dyn AnswerGenerator>,
        history: Arc<dyn SessionHistoryStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            documents,
            reranker,
            generator,
            history,
            config,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Answers `query` for `session_id`, or clears the session on [`RESET_COMMAND`].
    ///
    /// Errors from the store or reranker abort the exchange without touching
    /// history. Generator failures are turned into answer text.
    pub async fn handle_query(
        &self,
        session_id: &str,
        query: &str,
    ) -> Result<AnswerResponse, ApiError> {
        let _guard = self.lock_session(session_id).await;

        if query == RESET_COMMAND {
            self.clear_history(session_id).await;
            return Ok(AnswerResponse::without_sources(
                AnswerKind::HistoryCleared,
                HISTORY_CLEARED_ANSWER,
            ));
        }

        let started = Instant::now();
        tracing::info!(
            "Received query for session {} ({} chars)",
            session_id,
            query.chars().count()
        );

        let candidates = self.documents.query(query, self.config.top_k).await?;
        if candidates.is_empty() {
            tracing::info!("No candidates retrieved for session {}", session_id);
            return Ok(AnswerResponse::without_sources(
                AnswerKind::NoMatches,
                NO_MATCHES_ANSWER,
            ));
        }
        let retrieved = candidates.len();
        tracing::debug!(
            "Retrieved {} candidates (best similarity {:.3})",
            retrieved,
            candidates[0].similarity
        );

        let top = rerank(
            self.reranker.as_ref(),
            query,
            candidates,
            self.config.rerank_top_n,
        )
        .await?;
        tracing::debug!(
            "Reranked {} candidates, kept {} (top score {:.3})",
            retrieved,
            top.len(),
            top.first().map(|s| s.relevance_score).unwrap_or_default()
        );

        let window = self
            .history
            .recent(session_id, self.config.history_exchanges * 2)
            .await;
        let prompt = compose_prompt(&top, &window, query);

        let (answer, generation_failed) = match self.generator.generate(&prompt).await {
            Ok(text) => (text, false),
            Err(err) => {
                tracing::warn!("{} generation failed: {}", self.generator.name(), err);
                (format!("{} Error: {}", self.generator.name(), err), true)
            }
        };

        if !generation_failed || self.config.record_failed_generations {
            self.history
                .append_exchange(session_id, Turn::user(query), Turn::assistant(answer.as_str()))
                .await;
        }

        tracing::info!(
            "Answered session {} with {} sources in {:?}",
            session_id,
            top.len(),
            started.elapsed()
        );

        Ok(AnswerResponse {
            kind: AnswerKind::Answered,
            answer,
            sources: top
                .into_iter()
                .map(|scored| Source {
                    title: scored.document.title,
                })
                .collect(),
            generation_failed,
        })
    }

    /// Clears the session once any in-flight exchange on it has been recorded.
    pub async fn reset_session(&self, session_id: &str) -> usize {
        let _guard = self.lock_session(session_id).await;
        self.clear_history(session_id).await
    }

    async fn clear_history(&self, session_id: &str) -> usize {
        let removed = self.history.reset(session_id).await;
        tracing::info!("Cleared {} turns for session {}", removed, session_id);
        removed
    }

    async fn lock_session(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .session_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
