//! Per-session conversation history.
//!
//! History lives in process memory only and is lost on restart. The
//! `SessionHistoryStore` trait keeps the orchestrator independent of that
//! choice.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn role(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => write!(f, "User"),
            Speaker::Assistant => write!(f, "Assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub speaker: Speaker,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text)
    }

    fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait SessionHistoryStore: Send + Sync {
    /// Full history, oldest first. Unknown sessions are empty.
    async fn get(&self, session_id: &str) -> Vec<Turn>;

    /// The trailing `limit` turns, oldest first.
    async fn recent(&self, session_id: &str, limit: usize) -> Vec<Turn> {
        let history = self.get(session_id).await;
        let start = history.len().saturating_sub(limit);
        history[start..].to_vec()
    }

    async fn append(&self, session_id: &str, turn: Turn);

    /// Appends a user/assistant pair so no other writer can land between them.
    async fn append_exchange(&self, session_id: &str, user: Turn, assistant: Turn);

    /// Clears the session's history; returns how many turns were removed.
    async fn reset(&self, session_id: &str) -> usize;

    async fn session_ids(&self) -> Vec<String>;
}

type SessionSlot = Arc<Mutex<Vec<Turn>>>;

/// In-memory store with one lock per session, so writers on different
/// sessions never contend.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    sessions: RwLock<HashMap<String, SessionSlot>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, session_id: &str) -> SessionSlot {
        if let Some(slot) = self.sessions.read().await.get(session_id) {
            return slot.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone()
    }

    async fn existing_slot(&self, session_id: &str) -> Option<SessionSlot> {
        self.sessions.read().await.get(session_id).cloned()
    }
}

#[async_trait]
impl SessionHistoryStore for InMemoryHistoryStore {
    async fn get(&self, session_id: &str) -> Vec<Turn> {
        match self.existing_slot(session_id).await {
            Some(slot) => slot.lock().await.clone(),
            None => Vec::new(),
        }
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Vec<Turn> {
        let Some(slot) = self.existing_slot(session_id).await else {
            return Vec::new();
        };
        let history = slot.lock().await;
        let start = history.len().saturating_sub(limit);
        history[start..].to_vec()
    }

    async fn append(&self, session_id: &str, turn: Turn) {
        let slot = self.slot(session_id).await;
        slot.lock().await.push(turn);
    }

    async fn append_exchange(&self, session_id: &str, user: Turn, assistant: Turn) {
        let slot = self.slot(session_id).await;
        let mut history = slot.lock().await;
        history.push(user);
        history.push(assistant);
    }

    async fn reset(&self, session_id: &str) -> usize {
        let Some(slot) = self.existing_slot(session_id).await else {
            return 0;
        };
        let mut history = slot.lock().await;
        let removed = history.len();
        history.clear();
        removed
    }

    async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(turns: &[Turn]) -> Vec<String> {
        turns
            .iter()
            .map(|t| format!("{}: {}", t.speaker, t.text))
            .collect()
    }

    #[tokio::test]
    async fn unseen_session_is_empty() {
        let store = InMemoryHistoryStore::new();
        assert!(store.get("nobody").await.is_empty());
        assert!(store.recent("nobody", 6).await.is_empty());
        assert_eq!(store.reset("nobody").await, 0);
    }

    #[tokio::test]
    async fn append_exchange_adds_user_then_assistant() {
        let store = InMemoryHistoryStore::new();
        store
            .append_exchange("s1", Turn::user("oats?"), Turn::assistant("yes, 1 cup"))
            .await;

        let history = store.get("s1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].speaker, Speaker::User);
        assert_eq!(history[1].speaker, Speaker::Assistant);
    }

    #[tokio::test]
    async fn recent_returns_trailing_window_in_order() {
        let store = InMemoryHistoryStore::new();
        for i in 0..5 {
            store
                .append_exchange(
                    "s1",
                    Turn::user(format!("q{}", i)),
                    Turn::assistant(format!("a{}", i)),
                )
                .await;
        }

        let window = store.recent("s1", 6).await;
        assert_eq!(
            texts(&window),
            vec![
                "User: q2",
                "Assistant: a2",
                "User: q3",
                "Assistant: a3",
                "User: q4",
                "Assistant: a4"
            ]
        );
        assert_eq!(store.get("s1").await.len(), 10);
    }

    #[tokio::test]
    async fn reset_clears_only_the_named_session() {
        let store = InMemoryHistoryStore::new();
        store.append("s1", Turn::user("a")).await;
        store.append("s1", Turn::assistant("b")).await;
        store.append("s2", Turn::user("c")).await;

        assert_eq!(store.reset("s1").await, 2);
        assert!(store.get("s1").await.is_empty());
        assert_eq!(store.get("s2").await.len(), 1);
        assert_eq!(store.session_ids().await, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn concurrent_exchanges_never_interleave() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_exchange(
                        "shared",
                        Turn::user(format!("q{}", i)),
                        Turn::assistant(format!("a{}", i)),
                    )
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let history = store.get("shared").await;
        assert_eq!(history.len(), 32);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].speaker, Speaker::User);
            assert_eq!(pair[1].speaker, Speaker::Assistant);
            assert_eq!(pair[0].text[1..], pair[1].text[1..]);
        }
    }
}
