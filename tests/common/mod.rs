#![allow(dead_code)]

use std::sync::Arc;

use chat_service::config::Config;
use chat_service::models::UserProfile;
use chat_service::state::AppState;
use chat_service::store::MemoryStore;
use chat_service::websocket::events::ServerEvent;
use chat_service::websocket::{SessionId, SessionRegistry};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

pub fn test_state() -> AppState {
    AppState {
        store: Arc::new(MemoryStore::new()),
        registry: SessionRegistry::new(),
        config: Arc::new(Config::test_defaults()),
    }
}

pub async fn seed_user(state: &AppState, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    state
        .store
        .upsert_user(UserProfile {
            id,
            name: name.to_string(),
            email: format!("{name}@example.com"),
            avatar_url: None,
        })
        .await
        .expect("seed user");
    id
}

/// Open a session and identify it as `user_id`, draining the ack.
pub async fn open_identified_session(
    state: &AppState,
    user_id: Uuid,
) -> (SessionId, UnboundedReceiver<ServerEvent>) {
    let (session_id, mut rx) = state.registry.register_channel().await;
    chat_service::websocket::router::dispatch(
        state,
        session_id,
        chat_service::websocket::events::ClientEvent::Identify { user_id },
    )
    .await;
    let ack = rx.try_recv().expect("identified ack");
    assert_eq!(ack.kind(), "identified");
    (session_id, rx)
}

/// Everything queued on the session so far.
pub fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

pub fn kinds(events: &[ServerEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.kind()).collect()
}
