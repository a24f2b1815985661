pub const SERVER_HOST: &str = "0.0.0.0";
pub const SERVER_PORT: u16 = 5000;

pub const COLLECTION_NAME: &str = "nutrition_data";
pub const RETRIEVAL_TOP_K: usize = 10;
pub const RERANK_TOP_N: usize = 6;
pub const HISTORY_EXCHANGES: usize = 3;

pub const EMBEDDING_BASE_URL: &str = "http://127.0.0.1:8080";
pub const EMBEDDING_MODEL: &str = "sentence-transformers/all-mpnet-base-v2";

pub const RERANKER_BASE_URL: &str = "http://127.0.0.1:8081";
pub const RERANKER_MODEL: &str = "cross-encoder/ms-marco-MiniLM-L-6-v2";

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

pub const INGEST_DATA_PATH: &str = "./data/nutrition_data.txt";
pub const INGEST_BATCH_SIZE: usize = 32;

pub const REQUEST_TIMEOUT_SECS: u64 = 60;

pub fn local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}
