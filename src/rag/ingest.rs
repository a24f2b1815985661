//! One-shot indexing of the food description file.
//!
//! The source is plain text with one food item per paragraph (items separated
//! by a blank line). Rebuilding replaces the whole collection.

use std::path::Path;

use super::sqlite::SqliteDocumentStore;
use super::store::FoodDocument;
use crate::core::errors::ApiError;
use crate::llm::Embedder;

const ITEM_DELIMITER: &str = "\n\n";
const TITLE_SEPARATOR: &str = " is ";

/// Splits the raw file into documents with ids `food_<n>` and derived titles.
pub fn parse_food_items(raw: &str) -> Vec<FoodDocument> {
    raw.replace("\r\n", "\n")
        .split(ITEM_DELIMITER)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .enumerate()
        .map(|(index, text)| FoodDocument {
            id: format!("food_{}", index),
            title: derive_title(text, index),
            text: text.to_string(),
        })
        .collect()
}

fn derive_title(text: &str, index: usize) -> String {
    match text.split_once(TITLE_SEPARATOR) {
        Some((head, _)) => head.to_string(),
        None => format!("Food Item {}", index),
    }
}

/// Embeds `documents` in batches and swaps them into the store.
pub async fn index_documents(
    store: &SqliteDocumentStore,
    embedder: &dyn Embedder,
    documents: Vec<FoodDocument>,
    batch_size: usize,
) -> Result<usize, ApiError> {
    let batch_size = batch_size.max(1);
    let mut items = Vec::with_capacity(documents.len());

    for (batch_index, batch) in documents.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
        let embeddings = embedder.embed(&texts).await?;
        if embeddings.len() != batch.len() {
            return Err(ApiError::Internal(format!(
                "Embedding batch {} returned {} vectors for {} items",
                batch_index,
                embeddings.len(),
                batch.len()
            )));
        }
        tracing::debug!("Embedded batch {} ({} items)", batch_index, batch.len());
        items.extend(batch.iter().cloned().zip(embeddings));
    }

    store.replace_all(items).await
}

/// Reads `path`, rebuilds the collection and returns the number of documents indexed.
pub async fn ingest_file(
    path: &Path,
    store: &SqliteDocumentStore,
    batch_size: usize,
) -> Result<usize, ApiError> {
    if !path.exists() {
        return Err(ApiError::BadRequest(format!(
            "File not found at {}",
            path.display()
        )));
    }

    tracing::info!("Loading data from {}", path.display());
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read {}: {}", path.display(), e)))?;

    let documents = parse_food_items(&raw);
    tracing::info!("Found {} food descriptions", documents.len());
    if documents.is_empty() {
        tracing::warn!("No data found; collection '{}' will be emptied", store.collection());
    }

    let embedder = store.embedder();
    index_documents(store, embedder.as_ref(), documents, batch_size).await
}
