use std::sync::Arc;

use async_trait::async_trait;

use super::store::{FoodDocument, RetrievalResult};
use crate::core::errors::ApiError;
use crate::llm::Embedder;
use crate::vector_math;

/// A retrieved document with its reranker relevance score.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: FoodDocument,
    pub relevance_score: f32,
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Relevance of `document_text` to `query`; higher is more relevant.
    async fn score(&self, query: &str, document_text: &str) -> Result<f32, ApiError>;

    /// Scores for every text, in input order. Override when the backend can batch.
    async fn score_all(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>, ApiError> {
        let mut scores = Vec::with_capacity(texts.len());
        for text in texts {
            scores.push(self.score(query, text).await?);
        }
        Ok(scores)
    }
}

/// Scores every candidate, orders them by descending score and keeps `top_n`.
///
/// The sort is stable, so candidates with equal scores keep their retrieval
/// order. Nothing is added or dropped other than by truncation.
pub async fn rerank(
    reranker: &dyn Reranker,
    query: &str,
    candidates: Vec<RetrievalResult>,
    top_n: usize,
) -> Result<Vec<ScoredDocument>, ApiError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<&str> = candidates
        .iter()
        .map(|c| c.document.text.as_str())
        .collect();
    let scores = reranker.score_all(query, &texts).await?;
    if scores.len() != candidates.len() {
        return Err(ApiError::Internal(format!(
            "Reranker returned {} scores for {} candidates",
            scores.len(),
            candidates.len()
        )));
    }

    let mut scored: Vec<ScoredDocument> = candidates
        .into_iter()
        .zip(scores)
        .map(|(candidate, score)| ScoredDocument {
            document: candidate.document,
            relevance_score: normalize_score(score),
        })
        .collect();

    scored.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    scored.truncate(top_n);
    Ok(scored)
}

/// NaN sorts last; `-0.0` collapses to `0.0` so `total_cmp` sees it as a tie.
fn normalize_score(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else if score == 0.0 {
        0.0
    } else {
        score
    }
}

/// Bi-encoder fallback: cosine similarity between query and document embeddings.
pub struct EmbeddingReranker {
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingReranker {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl Reranker for EmbeddingReranker {
    async fn score(&self, query: &str, document_text: &str) -> Result<f32, ApiError> {
        let scores = self.score_all(query, &[document_text]).await?;
        scores
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("Empty rerank result".to_string()))
    }

    async fn score_all(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>, ApiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut inputs = Vec::with_capacity(texts.len() + 1);
        inputs.push(query.to_string());
        inputs.extend(texts.iter().map(|t| t.to_string()));

        let embeddings = self.embedder.embed(&inputs).await?;
        if embeddings.len() != inputs.len() {
            return Err(ApiError::Internal(format!(
                "Rerank embedding size mismatch: {} != {}",
                embeddings.len(),
                inputs.len()
            )));
        }

        let query_embedding = &embeddings[0];
        embeddings[1..]
            .iter()
            .map(|candidate| vector_math::cosine_similarity(query_embedding, candidate))
            .collect()
    }
}
