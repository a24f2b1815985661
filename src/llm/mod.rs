pub mod gemini;
pub mod openai;
pub mod provider;
pub mod types;

use std::sync::Arc;

use crate::core::config::{GeneratorProvider, GeneratorSettings};
use crate::core::errors::ApiError;

pub use gemini::GeminiGenerator;
pub use openai::{OpenAiCompatGenerator, OpenAiEmbedder};
pub use provider::{AnswerGenerator, Embedder};
pub use types::{ChatMessage, ChatRequest, GenerationError};

pub fn build_generator(
    settings: &GeneratorSettings,
) -> Result<Arc<dyn AnswerGenerator>, ApiError> {
    let generator: Arc<dyn AnswerGenerator> = match settings.provider {
        GeneratorProvider::Gemini => Arc::new(GeminiGenerator::new(settings)?),
        GeneratorProvider::OpenaiCompatible => Arc::new(OpenAiCompatGenerator::new(settings)?),
    };
    Ok(generator)
}
