use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::AnswerGenerator;
use super::types::GenerationError;
use crate::core::config::GeneratorSettings;
use crate::core::errors::ApiError;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini `generateContent` REST client.
#[derive(Clone)]
pub struct GeminiGenerator {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    client: Client,
}

impl GeminiGenerator {
    pub fn new(settings: &GeneratorSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            client,
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let mut generation_config = serde_json::Map::new();
        if let Some(t) = self.temperature {
            generation_config.insert("temperature".to_string(), json!(t));
        }
        if let Some(t) = self.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(t));
        }
        if !generation_config.is_empty() {
            body["generationConfig"] = Value::Object(generation_config);
        }
        body
    }
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::MissingApiKey)?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let res = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                status: status.as_u16(),
                message: parse_error_message(&text),
            });
        }

        let payload: Value = res.json().await?;
        if let Some(reason) = payload["promptFeedback"]["blockReason"].as_str() {
            return Err(GenerationError::Provider {
                status: status.as_u16(),
                message: format!("prompt blocked ({})", reason),
            });
        }
        parse_candidate_text(&payload).ok_or(GenerationError::EmptyResponse)
    }
}

fn parse_candidate_text(payload: &Value) -> Option<String> {
    let parts = payload["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(settings: GeneratorSettings) -> GeminiGenerator {
        GeminiGenerator::new(&settings).unwrap()
    }

    #[test]
    fn candidate_parts_are_concatenated() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Try oats, " }, { "text": "1 cup." }] }
            }]
        });
        assert_eq!(
            parse_candidate_text(&payload).as_deref(),
            Some("Try oats, 1 cup.")
        );
    }

    #[test]
    fn missing_candidates_yield_none() {
        assert!(parse_candidate_text(&json!({ "candidates": [] })).is_none());
    }

    #[test]
    fn error_message_prefers_structured_field() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(parse_error_message(body), "API key not valid.");
        assert_eq!(parse_error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn generation_config_is_only_sent_when_configured() {
        let plain = generator(GeneratorSettings::default());
        assert!(plain.request_body("hi").get("generationConfig").is_none());

        let tuned = generator(GeneratorSettings {
            temperature: Some(0.3),
            max_tokens: Some(256),
            ..Default::default()
        });
        let body = tuned.request_body("hi");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_network() {
        let gemini = generator(GeneratorSettings {
            api_key: Some("  ".to_string()),
            ..Default::default()
        });
        let err = gemini.generate("hello").await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey));
    }
}
