use async_trait::async_trait;

use super::types::GenerationError;
use crate::core::errors::ApiError;

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Provider label used when a failure is rendered as answer text (e.g. "Gemini").
    fn name(&self) -> &str;

    /// Single-shot completion of a fully composed prompt.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input, in input order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}
