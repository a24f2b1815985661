use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize embedder: {0}")]
    Embedder(#[source] anyhow::Error),

    #[error("Failed to open document store: {0}")]
    Documents(#[source] anyhow::Error),

    #[error("Failed to initialize reranker: {0}")]
    Reranker(#[source] anyhow::Error),

    #[error("Failed to initialize answer generator: {0}")]
    Generator(#[source] anyhow::Error),
}
