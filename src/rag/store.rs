//! DocumentStore trait: the retrieval boundary of the query pipeline.
//!
//! The primary implementation is `SqliteDocumentStore` in the `sqlite` module;
//! `InMemoryDocumentStore` keeps the same contract without a database.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::errors::ApiError;
use crate::llm::Embedder;
use crate::vector_math::rank_descending_by_cosine;

/// A food item as indexed by the ingestion job. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodDocument {
    pub id: String,
    pub text: String,
    pub title: String,
}

/// One candidate returned by a similarity query.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub document: FoodDocument,
    /// Position in the similarity ordering, 0 = most similar.
    pub similarity_rank: usize,
    /// Raw similarity reported by the store (higher = closer).
    pub similarity: f32,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Up to `top_k` documents, most similar first.
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievalResult>, ApiError>;

    /// Number of documents in the collection.
    async fn count(&self) -> Result<usize, ApiError>;
}

/// Process-local store for tests and ephemeral runs.
pub struct InMemoryDocumentStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<(FoodDocument, Vec<f32>)>>,
}

impl InMemoryDocumentStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Embeds and stores `documents`, replacing anything held before.
    pub async fn replace_all(&self, documents: Vec<FoodDocument>) -> Result<usize, ApiError> {
        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed(&texts).await?
        };
        if embeddings.len() != documents.len() {
            return Err(ApiError::Internal(format!(
                "Embedder returned {} vectors for {} documents",
                embeddings.len(),
                documents.len()
            )));
        }

        let mut entries = self.entries.write().await;
        *entries = documents.into_iter().zip(embeddings).collect();
        Ok(entries.len())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievalResult>, ApiError> {
        let entries = self.entries.read().await;
        if top_k == 0 || entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("Embedder returned no vector".to_string()))?;

        let vectors: Vec<Vec<f32>> = entries.iter().map(|(_, v)| v.clone()).collect();
        let ranked = rank_descending_by_cosine(&query_embedding, &vectors)
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(ranked
            .into_iter()
            .take(top_k)
            .enumerate()
            .map(|(similarity_rank, (index, similarity))| RetrievalResult {
                document: entries[index].0.clone(),
                similarity_rank,
                similarity,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, ApiError> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WordEmbedder;

    #[async_trait]
    impl Embedder for WordEmbedder {
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        t.contains("fiber") as u8 as f32,
                        t.contains("protein") as u8 as f32,
                        0.1,
                    ]
                })
                .collect())
        }
    }

    fn doc(i: usize, text: &str) -> FoodDocument {
        FoodDocument {
            id: format!("food_{}", i),
            text: text.to_string(),
            title: text.split(" is ").next().unwrap_or_default().to_string(),
        }
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let store = InMemoryDocumentStore::new(Arc::new(WordEmbedder));
        assert!(store.query("protein", 10).await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn query_orders_by_similarity_and_limits() {
        let store = InMemoryDocumentStore::new(Arc::new(WordEmbedder));
        store
            .replace_all(vec![
                doc(0, "Oats is high in fiber"),
                doc(1, "Chicken is rich in protein"),
                doc(2, "Water is hydrating"),
            ])
            .await
            .unwrap();

        let results = store.query("protein for dinner", 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.title, "Chicken");
        assert_eq!(results[0].similarity_rank, 0);
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[tokio::test]
    async fn replace_all_discards_previous_documents() {
        let store = InMemoryDocumentStore::new(Arc::new(WordEmbedder));
        store.replace_all(vec![doc(0, "Oats is fiber")]).await.unwrap();
        store
            .replace_all(vec![doc(0, "Tofu is protein"), doc(1, "Rice is a grain")])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        let titles: Vec<String> = store
            .query("anything", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.document.title)
            .collect();
        assert!(!titles.contains(&"Oats".to_string()));
    }
}
