//! SQLite-backed document store.
//!
//! Documents live in a named collection with their embedding stored as a
//! little-endian f32 blob; search is brute-force cosine similarity.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{DocumentStore, FoodDocument, RetrievalResult};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;
use crate::llm::Embedder;
use crate::vector_math::{cosine_similarity, decode_embedding, encode_embedding};

pub struct SqliteDocumentStore {
    pool: SqlitePool,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl SqliteDocumentStore {
    pub async fn new(
        paths: &AppPaths,
        collection: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, ApiError> {
        Self::with_path(paths.db_path.clone(), collection, embedder).await
    }

    pub async fn with_path(
        db_path: PathBuf,
        collection: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to open document db: {}", e)))?;

        let store = Self {
            pool,
            collection: collection.to_string(),
            embedder,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS food_documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                content TEXT NOT NULL,
                title TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (collection, id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Atomically swaps the whole collection for `items`.
    pub async fn replace_all(
        &self,
        items: Vec<(FoodDocument, Vec<f32>)>,
    ) -> Result<usize, ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        let removed = sqlx::query("DELETE FROM food_documents WHERE collection = ?1")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?
            .rows_affected();
        if removed > 0 {
            tracing::info!(
                "Removed {} documents from collection '{}'",
                removed,
                self.collection
            );
        }

        for (document, embedding) in &items {
            sqlx::query(
                "INSERT INTO food_documents (collection, id, content, title, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&self.collection)
            .bind(&document.id)
            .bind(&document.text)
            .bind(&document.title)
            .bind(encode_embedding(embedding))
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(items.len())
    }

    /// Similarity search against a precomputed query vector.
    pub async fn search_embedding(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, ApiError> {
        let rows = sqlx::query(
            "SELECT id, content, title, embedding
             FROM food_documents
             WHERE collection = ?1
             ORDER BY rowid ASC",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let embedding_bytes: Vec<u8> = row.get("embedding");
            let stored = decode_embedding(&embedding_bytes);
            let similarity = cosine_similarity(query_embedding, &stored).map_err(|e| {
                ApiError::Internal(format!(
                    "Cannot score document {} (was the index built with another model?): {}",
                    row.get::<String, _>("id"),
                    e
                ))
            })?;
            scored.push((
                FoodDocument {
                    id: row.get("id"),
                    text: row.get("content"),
                    title: row.get("title"),
                },
                similarity,
            ));
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(similarity_rank, (document, similarity))| RetrievalResult {
                document,
                similarity_rank,
                similarity,
            })
            .collect())
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievalResult>, ApiError> {
        if top_k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let embeddings = self.embedder.embed(&[text.to_string()]).await?;
        let query_embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("Embedder returned no vector".to_string()))?;

        self.search_embedding(&query_embedding, top_k).await
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM food_documents WHERE collection = ?1")
                .bind(&self.collection)
                .fetch_one(&self.pool)
                .await
                .map_err(ApiError::internal)?;

        Ok(count as usize)
    }
}
