//! Typed view over the merged `config.yml` + `secrets.yaml` document.
//!
//! Every field has a default so an empty config yields a runnable setup
//! against local model servers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub rag: RagSettings,
    pub embedding: EmbeddingSettings,
    pub reranker: RerankerSettings,
    pub generator: GeneratorSettings,
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            cors_allowed_origins: defaults::local_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub collection: String,
    /// Candidates requested from the document store.
    pub top_k: usize,
    /// Candidates kept after reranking.
    pub rerank_top_n: usize,
    /// Trailing user/assistant exchanges replayed into the prompt.
    pub history_exchanges: usize,
    /// Whether a substituted generation-error answer is still written to history.
    pub record_failed_generations: bool,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            collection: defaults::COLLECTION_NAME.to_string(),
            top_k: defaults::RETRIEVAL_TOP_K,
            rerank_top_n: defaults::RERANK_TOP_N,
            history_exchanges: defaults::HISTORY_EXCHANGES,
            record_failed_generations: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: defaults::EMBEDDING_BASE_URL.to_string(),
            model: defaults::EMBEDDING_MODEL.to_string(),
            api_key: None,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankerProvider {
    CrossEncoder,
    Embedding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub provider: RerankerProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            provider: RerankerProvider::CrossEncoder,
            base_url: defaults::RERANKER_BASE_URL.to_string(),
            model: defaults::RERANKER_MODEL.to_string(),
            api_key: None,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl RerankerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorProvider {
    Gemini,
    OpenaiCompatible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub provider: GeneratorProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            provider: GeneratorProvider::Gemini,
            base_url: defaults::GEMINI_BASE_URL.to_string(),
            model: defaults::GEMINI_MODEL.to_string(),
            api_key: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl GeneratorSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub data_path: String,
    pub batch_size: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            data_path: defaults::INGEST_DATA_PATH.to_string(),
            batch_size: defaults::INGEST_BATCH_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_yields_defaults() {
        let settings: AppSettings = serde_json::from_value(json!({})).unwrap();

        assert_eq!(settings.rag.top_k, 10);
        assert_eq!(settings.rag.rerank_top_n, 6);
        assert_eq!(settings.rag.history_exchanges, 3);
        assert!(settings.rag.record_failed_generations);
        assert_eq!(settings.generator.provider, GeneratorProvider::Gemini);
        assert_eq!(settings.generator.model, "gemini-2.5-flash");
        assert_eq!(settings.server.port, 5000);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let settings: AppSettings = serde_json::from_value(json!({
            "rag": { "top_k": 20 },
            "reranker": { "provider": "embedding" },
            "generator": { "provider": "openai_compatible", "base_url": "http://localhost:1234" }
        }))
        .unwrap();

        assert_eq!(settings.rag.top_k, 20);
        assert_eq!(settings.rag.rerank_top_n, 6);
        assert_eq!(settings.reranker.provider, RerankerProvider::Embedding);
        assert_eq!(settings.generator.provider, GeneratorProvider::OpenaiCompatible);
        assert_eq!(settings.generator.model, "gemini-2.5-flash");
    }
}
