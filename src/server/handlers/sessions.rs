use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::history::SessionHistoryStore;
use crate::state::AppState;

pub async fn get_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let messages: Vec<Value> = state
        .history
        .get(&session_id)
        .await
        .into_iter()
        .map(|turn| {
            json!({
                "id": turn.id.to_string(),
                "role": turn.speaker.role(),
                "content": turn.text,
                "timestamp": turn.created_at.to_rfc3339(),
            })
        })
        .collect();

    Ok(Json(json!({ "messages": messages })))
}

pub async fn clear_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.engine.reset_session(&session_id).await;
    Ok(Json(json!({ "success": true })))
}
