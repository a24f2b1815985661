use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::DocumentStore;
use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let documents = state.documents.count().await.map_err(|e| {
        tracing::warn!("Health check could not count documents: {}", e);
        ApiError::unavailable(e)
    })?;

    Ok(Json(json!({
        "status": "ok",
        "documents": documents
    })))
}
