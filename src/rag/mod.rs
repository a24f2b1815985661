//! Retrieval and reranking over the food document collection, plus the
//! query orchestrator that ties them to generation and history.

pub mod cross_encoder;
pub mod engine;
pub mod ingest;
pub mod reranker;
pub mod sqlite;
pub mod store;

use std::sync::Arc;

use crate::core::config::{RerankerProvider, RerankerSettings};
use crate::core::errors::ApiError;
use crate::llm::Embedder;

pub use cross_encoder::CrossEncoderReranker;
pub use engine::{
    AnswerKind, AnswerResponse, EngineConfig, RagEngine, Source, HISTORY_CLEARED_ANSWER,
    NO_MATCHES_ANSWER, RESET_COMMAND,
};
pub use ingest::{index_documents, ingest_file, parse_food_items};
pub use reranker::{rerank, EmbeddingReranker, Reranker, ScoredDocument};
pub use sqlite::SqliteDocumentStore;
pub use store::{DocumentStore, FoodDocument, InMemoryDocumentStore, RetrievalResult};

pub fn build_reranker(
    settings: &RerankerSettings,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<dyn Reranker>, ApiError> {
    let reranker: Arc<dyn Reranker> = match settings.provider {
        RerankerProvider::CrossEncoder => Arc::new(CrossEncoderReranker::new(settings)?),
        RerankerProvider::Embedding => Arc::new(EmbeddingReranker::new(embedder)),
    };
    Ok(reranker)
}
