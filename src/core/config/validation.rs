use serde_json::{Map, Value};

use super::defaults;
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_optional_string_field(rag, "rag.collection", "collection")?;
        validate_u64_field(rag, "rag.top_k", "top_k", 1, 1000)?;
        let top_k = rag
            .get("top_k")
            .and_then(|v| v.as_u64())
            .unwrap_or(defaults::RETRIEVAL_TOP_K as u64);
        validate_u64_field(rag, "rag.rerank_top_n", "rerank_top_n", 1, top_k)?;
        validate_u64_field(rag, "rag.history_exchanges", "history_exchanges", 0, 100)?;
        validate_bool_field(
            rag,
            "rag.record_failed_generations",
            "record_failed_generations",
        )?;
    }

    for section_name in ["embedding", "reranker", "generator"] {
        if let Some(section) = expect_optional_object(root, section_name)? {
            validate_optional_string_field(
                section,
                &format!("{}.base_url", section_name),
                "base_url",
            )?;
            validate_optional_string_field(section, &format!("{}.model", section_name), "model")?;
            validate_optional_string_field(
                section,
                &format!("{}.api_key", section_name),
                "api_key",
            )?;
            validate_u64_field(
                section,
                &format!("{}.timeout_secs", section_name),
                "timeout_secs",
                1,
                600,
            )?;
        }
    }

    if let Some(reranker) = expect_optional_object(root, "reranker")? {
        validate_enum_field(
            reranker,
            "reranker.provider",
            "provider",
            &["cross_encoder", "embedding"],
        )?;
    }

    if let Some(generator) = expect_optional_object(root, "generator")? {
        validate_enum_field(
            generator,
            "generator.provider",
            "provider",
            &["gemini", "openai_compatible"],
        )?;
        validate_u64_field(generator, "generator.max_tokens", "max_tokens", 1, 1_000_000)?;
        if let Some(value) = generator.get("temperature") {
            if value.as_f64().is_none() {
                return Err(config_type_error("generator.temperature", "number"));
            }
        }
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_optional_string_field(ingest, "ingest.data_path", "data_path")?;
        validate_u64_field(ingest, "ingest.batch_size", "batch_size", 1, 4096)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if allowed.contains(&text) {
        return Ok(());
    }
    Err(ApiError::BadRequest(format!(
        "Invalid config at '{}': expected one of {}",
        path,
        allowed.join(", ")
    )))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_full_configs() {
        validate_config(&json!({})).unwrap();
        validate_config(&json!({
            "server": { "host": "127.0.0.1", "port": 8000, "cors_allowed_origins": ["http://localhost:3000"] },
            "rag": { "top_k": 10, "rerank_top_n": 6, "history_exchanges": 3, "record_failed_generations": false },
            "reranker": { "provider": "embedding", "timeout_secs": 5 },
            "generator": { "provider": "gemini", "api_key": null, "temperature": 0.2, "max_tokens": 512 },
            "ingest": { "data_path": "foods.txt", "batch_size": 16 }
        }))
        .unwrap();
    }

    #[test]
    fn rejects_rerank_top_n_above_top_k() {
        let err =
            validate_config(&json!({ "rag": { "top_k": 4, "rerank_top_n": 6 } })).unwrap_err();
        assert!(err.to_string().contains("rag.rerank_top_n"));
    }

    #[test]
    fn rejects_zero_top_k() {
        let err = validate_config(&json!({ "rag": { "top_k": 0 } })).unwrap_err();
        assert!(err.to_string().contains("rag.top_k"));
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = validate_config(&json!({ "generator": { "provider": "palm" } })).unwrap_err();
        assert!(err.to_string().contains("generator.provider"));
    }

    #[test]
    fn rejects_wrong_section_type() {
        let err = validate_config(&json!({ "rag": [1, 2] })).unwrap_err();
        assert!(err.to_string().contains("expected object"));
    }

    #[test]
    fn rejects_blank_origin() {
        let err = validate_config(&json!({ "server": { "cors_allowed_origins": ["  "] } }))
            .unwrap_err();
        assert!(err.to_string().contains("server.cors_allowed_origins[0]"));
    }
}
