use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::models::MessageDetails;
use crate::services::message_service::MessageService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    pub chat_id: Uuid,
}

/// POST /api/message — persist a message and move the chat's
/// latest-message pointer. Realtime fan-out happens on the socket, where
/// the sending client emits `new_message` itself.
pub async fn send_message(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<MessageDetails>, AppError> {
    let message =
        MessageService::send_message(state.store.as_ref(), user.id, body.chat_id, &body.content)
            .await?;
    Ok(Json(message))
}

/// GET /api/message/:chat_id — full history in creation order.
pub async fn get_all_messages(
    State(state): State<AppState>,
    _user: User,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<Vec<MessageDetails>>, AppError> {
    let messages = MessageService::chat_history(state.store.as_ref(), chat_id).await?;
    Ok(Json(messages))
}
