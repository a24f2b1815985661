use std::sync::Arc;

use crate::core::config::{AppPaths, AppSettings, ConfigService};
use crate::history::{InMemoryHistoryStore, SessionHistoryStore};
use crate::llm::{build_generator, AnswerGenerator, Embedder, OpenAiEmbedder};
use crate::rag::{
    build_reranker, DocumentStore, EngineConfig, RagEngine, Reranker, SqliteDocumentStore,
};

pub mod error;

use error::InitializationError;

/// Shared application state handed to every route.
///
/// Holds the resolved configuration plus the collaborators the query
/// orchestrator was built from, so handlers can reach the stores directly
/// (health counts, session transcripts).
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<AppSettings>,
    pub documents: Arc<dyn DocumentStore>,
    pub history: Arc<dyn SessionHistoryStore>,
    pub engine: Arc<RagEngine>,
}

impl AppState {
    /// Loads configuration and wires the collaborators.
    ///
    /// 1. Load and validate `config.yml` + `secrets.yaml`
    /// 2. Build the embedder and open the document store
    /// 3. Build the reranker and answer generator
    /// 4. Assemble the orchestrator over an in-memory history store
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;
        tracing::debug!(
            "Effective settings: {}",
            config.redact_sensitive_values(&config.load_config())
        );

        let embedder: Arc<dyn Embedder> = Arc::new(
            OpenAiEmbedder::new(&settings.embedding)
                .map_err(|e| InitializationError::Embedder(e.into()))?,
        );

        let store = SqliteDocumentStore::new(
            paths.as_ref(),
            &settings.rag.collection,
            embedder.clone(),
        )
        .await
        .map_err(|e| InitializationError::Documents(e.into()))?;
        match store.count().await {
            Ok(0) => tracing::warn!(
                "Collection '{}' is empty; run nutribot-ingest to index food data",
                settings.rag.collection
            ),
            Ok(n) => tracing::info!(
                "Collection '{}' holds {} documents",
                settings.rag.collection,
                n
            ),
            Err(e) => return Err(InitializationError::Documents(e.into())),
        }
        let documents: Arc<dyn DocumentStore> = Arc::new(store);

        let reranker = build_reranker(&settings.reranker, embedder)
            .map_err(|e| InitializationError::Reranker(e.into()))?;
        let generator = build_generator(&settings.generator)
            .map_err(|e| InitializationError::Generator(e.into()))?;
        tracing::info!("Answer generator: {}", generator.name());

        Ok(Self::from_parts(settings, documents, reranker, generator))
    }

    /// Assembles state around already-built collaborators with fresh history.
    pub fn from_parts(
        settings: AppSettings,
        documents: Arc<dyn DocumentStore>,
        reranker: Arc<dyn Reranker>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Arc<Self> {
        let history: Arc<dyn SessionHistoryStore> = Arc::new(InMemoryHistoryStore::new());
        let engine = Arc::new(RagEngine::new(
            documents.clone(),
            reranker,
            generator,
            history.clone(),
            EngineConfig::from(&settings.rag),
        ));
        Arc::new(AppState {
            settings: Arc::new(settings),
            documents,
            history,
            engine,
        })
    }
}
