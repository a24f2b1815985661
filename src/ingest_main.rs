//! Rebuilds the food document collection from a text file.
//!
//! Usage: `nutribot-ingest [path]`. Without a path, `ingest.data_path` from
//! the config is used.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use nutribot_backend::core::config::{AppPaths, ConfigService};
use nutribot_backend::core::logging;
use nutribot_backend::llm::{Embedder, OpenAiEmbedder};
use nutribot_backend::rag::{ingest_file, SqliteDocumentStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "ingest.log");

    let config = ConfigService::new(paths.clone());
    let settings = config.load_settings().context("Failed to load configuration")?;

    let source: PathBuf = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => paths.resolve(&settings.ingest.data_path),
    };

    let embedder: Arc<dyn Embedder> = Arc::new(
        OpenAiEmbedder::new(&settings.embedding).context("Failed to build embedder")?,
    );
    let store = SqliteDocumentStore::new(&paths, &settings.rag.collection, embedder)
        .await
        .context("Failed to open document store")?;

    let indexed = ingest_file(&source, &store, settings.ingest.batch_size)
        .await
        .with_context(|| format!("Ingestion from {} failed", source.display()))?;

    tracing::info!(
        "Indexed {} documents into collection '{}'",
        indexed,
        store.collection()
    );
    Ok(())
}
