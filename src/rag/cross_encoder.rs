//! Cross-encoder reranker served over HTTP.
//!
//! Speaks the text-embeddings-inference `/rerank` protocol:
//! `{query, texts}` in, `[{index, score}]` out.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::reranker::Reranker;
use crate::core::config::RerankerSettings;
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct CrossEncoderReranker {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct RerankEntry {
    index: usize,
    score: f32,
}

impl CrossEncoderReranker {
    pub fn new(settings: &RerankerSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
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

        let url = format!("{}/rerank", self.base_url);
        let body = json!({
            "model": self.model,
            "query": query,
            "texts": texts,
            "raw_scores": true,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            request = request.bearer_auth(key);
        }
        let res = request.send().await.map_err(ApiError::unavailable)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Reranker error: {}", text)));
        }

        let entries: Vec<RerankEntry> = res.json().await.map_err(ApiError::internal)?;
        scores_in_input_order(entries, texts.len())
    }
}

/// The server returns entries sorted by score; put them back in input order.
fn scores_in_input_order(entries: Vec<RerankEntry>, expected: usize) -> Result<Vec<f32>, ApiError> {
    let mut scores: Vec<Option<f32>> = vec![None; expected];
    for entry in entries {
        let slot = scores.get_mut(entry.index).ok_or_else(|| {
            ApiError::Internal(format!("Reranker returned out-of-range index {}", entry.index))
        })?;
        *slot = Some(entry.score);
    }

    scores
        .into_iter()
        .enumerate()
        .map(|(idx, score)| {
            score.ok_or_else(|| ApiError::Internal(format!("Reranker omitted index {}", idx)))
        })
        .collect()
}
