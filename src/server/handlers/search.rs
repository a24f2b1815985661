use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::{AnswerKind, AnswerResponse};
use crate::state::AppState;

pub const SESSION_HEADER: &str = "x-session-id";
pub const DEFAULT_SESSION_ID: &str = "default_user";

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let session_id = resolve_session_id(request.session_id.as_deref(), &headers);

    let response = state
        .engine
        .handle_query(&session_id, &request.query)
        .await
        .map_err(|err| {
            tracing::error!("Query failed for session {}: {}", session_id, err);
            err
        })?;

    Ok(Json(response_body(&response)))
}

/// Body field first, then the session header, then the shared default.
fn resolve_session_id(from_body: Option<&str>, headers: &HeaderMap) -> String {
    from_body
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|id| !id.is_empty())
        })
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string()
}

fn response_body(response: &AnswerResponse) -> serde_json::Value {
    match response.kind {
        AnswerKind::Answered => json!({
            "success": true,
            "answer": response.answer,
            "sources": response.sources,
        }),
        AnswerKind::NoMatches => json!({ "answer": response.answer }),
        AnswerKind::HistoryCleared => json!({
            "success": true,
            "answer": response.answer,
        }),
    }
}
