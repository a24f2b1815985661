use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::defaults;
use crate::server::handlers::search::SESSION_HEADER;
use crate::server::handlers::{health, search, sessions};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// `/search` is kept as an alias of `/api/search` for older clients.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_allowed_origins);
    Router::new()
        .route("/health", get(health::health))
        .route("/api/search", post(search::search))
        .route("/search", post(search::search))
        .route(
            "/api/sessions/:session_id/messages",
            get(sessions::get_session_messages).delete(sessions::clear_session_messages),
        )
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let origins = resolve_allowed_origins(configured)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static(SESSION_HEADER),
        ])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return defaults::local_origins();
    }
    origins
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AppSettings;
    use crate::core::errors::ApiError;
    use crate::history::{SessionHistoryStore, Turn};
    use crate::llm::{AnswerGenerator, Embedder, GenerationError};
    use crate::rag::{FoodDocument, InMemoryDocumentStore, Reranker};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        t.contains("fiber") as u8 as f32,
                        t.contains("protein") as u8 as f32,
                        0.5,
                    ]
                })
                .collect())
        }
    }

    struct OverlapReranker;

    #[async_trait]
    impl Reranker for OverlapReranker {
        async fn score(&self, query: &str, document_text: &str) -> Result<f32, ApiError> {
            let doc = document_text.to_lowercase();
            Ok(query
                .to_lowercase()
                .split_whitespace()
                .filter(|word| doc.contains(word))
                .count() as f32)
        }
    }

    struct EchoGenerator {
        fail: bool,
        delay: Duration,
    }

    #[async_trait]
    impl AnswerGenerator for EchoGenerator {
        fn name(&self) -> &str {
            "Gemini"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(GenerationError::Transport("connection reset".to_string()));
            }
            Ok("Try 1 cup of oats.".to_string())
        }
    }

    struct TestApp {
        state: Arc<AppState>,
    }

    async fn test_app(foods: &[&str], fail_generation: bool) -> TestApp {
        test_app_with(
            foods,
            EchoGenerator {
                fail: fail_generation,
                delay: Duration::ZERO,
            },
        )
        .await
    }

    async fn test_app_with(foods: &[&str], generator: EchoGenerator) -> TestApp {
        let store = InMemoryDocumentStore::new(Arc::new(KeywordEmbedder));
        store
            .replace_all(
                foods
                    .iter()
                    .enumerate()
                    .map(|(i, text)| FoodDocument {
                        id: format!("food_{}", i),
                        text: text.to_string(),
                        title: text.split(" is ").next().unwrap_or_default().to_string(),
                    })
                    .collect(),
            )
            .await
            .unwrap();

        let state = AppState::from_parts(
            AppSettings::default(),
            Arc::new(store),
            Arc::new(OverlapReranker),
            Arc::new(generator),
        );
        TestApp { state }
    }

    async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(app.state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const FOODS: [&str; 3] = [
        "Oats is a whole grain high in fiber.",
        "Chicken breast is lean protein.",
        "Lentils is a legume with protein and fiber.",
    ];

    #[tokio::test]
    async fn search_returns_answer_with_sources() {
        let app = test_app(&FOODS, false).await;

        let (status, body) = send(
            &app,
            post_json("/api/search", json!({"query": "protein dinner", "session_id": "u1"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["answer"], json!("Try 1 cup of oats."));
        let sources = body["sources"].as_array().unwrap();
        assert_eq!(sources.len(), 3);
        assert!(sources.iter().all(|s| s["title"].is_string()));
        assert_eq!(app.state.history.get("u1").await.len(), 2);
    }

    #[tokio::test]
    async fn legacy_alias_and_header_session_are_honored() {
        let app = test_app(&FOODS, false).await;
        let request = Request::builder()
            .method("POST")
            .uri("/search")
            .header("content-type", "application/json")
            .header(SESSION_HEADER, "from-header")
            .body(Body::from(json!({"query": "fiber"}).to_string()))
            .unwrap();

        let (status, _) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.state.history.get("from-header").await.len(), 2);
        assert!(app.state.history.get("default_user").await.is_empty());
    }

    #[tokio::test]
    async fn missing_session_uses_default_user() {
        let app = test_app(&FOODS, false).await;

        send(&app, post_json("/api/search", json!({"query": "fiber"}))).await;

        assert_eq!(app.state.history.get("default_user").await.len(), 2);
    }

    #[tokio::test]
    async fn empty_store_returns_answer_only() {
        let app = test_app(&[], false).await;

        let (status, body) = send(
            &app,
            post_json("/api/search", json!({"query": "kale smoothie", "session_id": "u1"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"answer": "I couldn't find any matching food items in my database."})
        );
        assert!(app.state.history.get("u1").await.is_empty());
    }

    #[tokio::test]
    async fn reset_command_clears_session() {
        let app = test_app(&FOODS, false).await;
        for (q, a) in [("one", "a1"), ("two", "a2")] {
            app.state
                .history
                .append_exchange("u1", Turn::user(q), Turn::assistant(a))
                .await;
        }

        let (status, body) = send(
            &app,
            post_json("/api/search", json!({"query": "RESET_CHAT", "session_id": "u1"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "answer": "Chat history cleared."}));
        assert!(app.state.history.get("u1").await.is_empty());
    }

    #[tokio::test]
    async fn generation_failure_is_success_shaped() {
        let app = test_app(&FOODS, true).await;

        let (status, body) = send(
            &app,
            post_json("/api/search", json!({"query": "fiber", "session_id": "u1"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert!(body["answer"]
            .as_str()
            .unwrap()
            .starts_with("Gemini Error: "));
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_without_history_change() {
        let app = test_app(&FOODS, false).await;

        let (status, body) = send(
            &app,
            post_json("/api/search", json!({"session_id": "u1", "text": "no query"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(app.state.history.session_ids().await.is_empty());
    }

    #[tokio::test]
    async fn session_messages_can_be_listed_and_cleared() {
        let app = test_app(&FOODS, false).await;
        send(
            &app,
            post_json("/api/search", json!({"query": "fiber", "session_id": "u1"})),
        )
        .await;

        let list = Request::builder()
            .uri("/api/sessions/u1/messages")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, list).await;
        assert_eq!(status, StatusCode::OK);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], json!("user"));
        assert_eq!(messages[0]["content"], json!("fiber"));
        assert_eq!(messages[1]["role"], json!("assistant"));
        assert!(messages[1]["timestamp"].is_string());

        let clear = Request::builder()
            .method("DELETE")
            .uri("/api/sessions/u1/messages")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, clear).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));
        assert!(app.state.history.get("u1").await.is_empty());
    }

    #[tokio::test]
    async fn clearing_messages_waits_for_in_flight_search() {
        let app = test_app_with(
            &FOODS,
            EchoGenerator {
                fail: false,
                delay: Duration::from_millis(50),
            },
        )
        .await;

        let router = router(app.state.clone());
        let search = tokio::spawn(router.oneshot(post_json(
            "/api/search",
            json!({"query": "fiber", "session_id": "u1"}),
        )));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let clear = Request::builder()
            .method("DELETE")
            .uri("/api/sessions/u1/messages")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, clear).await;
        let searched = search.await.unwrap().unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(searched.status(), StatusCode::OK);
        assert!(app.state.history.get("u1").await.is_empty());
    }

    #[tokio::test]
    async fn health_reports_document_count() {
        let app = test_app(&FOODS, false).await;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "documents": 3}));
    }

    #[test]
    fn blank_origin_list_falls_back_to_local_defaults() {
        assert_eq!(
            resolve_allowed_origins(&[" ".to_string()]),
            defaults::local_origins()
        );
        assert_eq!(
            resolve_allowed_origins(&["https://nutribot.app".to_string()]),
            vec!["https://nutribot.app"]
        );
    }
}
