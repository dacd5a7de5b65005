use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::state::AppState;
use crate::websocket::handlers::ws_handler;

pub mod chats;
pub mod messages;
pub mod notifications;

async fn health() -> &'static str {
    "Api is running..."
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/chat", post(chats::access_chat).get(chats::fetch_chats))
        .route("/api/chat/create-group", post(chats::create_group_chat))
        .route("/api/chat/rename-group", put(chats::rename_group_chat))
        .route("/api/chat/add-to-group", put(chats::add_to_group))
        .route("/api/chat/remove-from-group", put(chats::remove_from_group))
        .route("/api/chat/:chat_id", delete(chats::delete_chat))
        .route("/api/message", post(messages::send_message))
        .route("/api/message/:chat_id", get(messages::get_all_messages))
        .route(
            "/api/notification",
            get(notifications::fetch_notifications).post(notifications::add_notification),
        )
        .route("/ws", get(ws_handler))
        .with_state(state)
}
