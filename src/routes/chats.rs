use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::models::ChatDetails;
use crate::services::chat_service::ChatService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AccessChatRequest {
    pub user_id: Uuid,
}

/// POST /api/chat — resolve or create the direct chat with another user.
pub async fn access_chat(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<AccessChatRequest>,
) -> Result<Json<ChatDetails>, AppError> {
    let chat =
        ChatService::get_or_create_direct_chat(state.store.as_ref(), user.id, body.user_id)
            .await?;
    Ok(Json(chat))
}

/// GET /api/chat — all chats of the requester, most recently updated first.
pub async fn fetch_chats(
    State(state): State<AppState>,
    user: User,
) -> Result<Json<Vec<ChatDetails>>, AppError> {
    let chats = ChatService::list_chats_for_user(state.store.as_ref(), user.id).await?;
    Ok(Json(chats))
}

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub users: Vec<Uuid>,
}

pub async fn create_group_chat(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<ChatDetails>), AppError> {
    let chat =
        ChatService::create_group_chat(state.store.as_ref(), user.id, &body.name, &body.users)
            .await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

#[derive(Deserialize)]
pub struct RenameGroupRequest {
    pub chat_id: Uuid,
    pub chat_name: String,
}

pub async fn rename_group_chat(
    State(state): State<AppState>,
    _user: User,
    Json(body): Json<RenameGroupRequest>,
) -> Result<Json<ChatDetails>, AppError> {
    let chat =
        ChatService::rename_group_chat(state.store.as_ref(), body.chat_id, &body.chat_name)
            .await?;
    Ok(Json(chat))
}

#[derive(Deserialize)]
pub struct GroupMemberRequest {
    pub chat_id: Uuid,
    pub user_id: Uuid,
}

pub async fn add_to_group(
    State(state): State<AppState>,
    _user: User,
    Json(body): Json<GroupMemberRequest>,
) -> Result<Json<ChatDetails>, AppError> {
    let chat = ChatService::add_member(state.store.as_ref(), body.chat_id, body.user_id).await?;
    Ok(Json(chat))
}

pub async fn remove_from_group(
    State(state): State<AppState>,
    _user: User,
    Json(body): Json<GroupMemberRequest>,
) -> Result<Json<ChatDetails>, AppError> {
    let chat =
        ChatService::remove_member(state.store.as_ref(), body.chat_id, body.user_id).await?;
    Ok(Json(chat))
}

/// DELETE /api/chat/:chat_id — remove the chat and every mailbox entry that
/// references it, then signal affected live sessions.
pub async fn delete_chat(
    State(state): State<AppState>,
    _user: User,
    Path(chat_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    use crate::websocket::events::ServerEvent;

    state
        .registry
        .send_to_room(chat_id, &ServerEvent::ChatDeleted { chat_id }, None)
        .await;
    let affected = ChatService::delete_chat(state.store.as_ref(), chat_id).await?;
    for user_id in affected {
        let notifications =
            crate::services::notification_service::NotificationService::list_for(
                state.store.as_ref(),
                user_id,
            )
            .await?;
        state
            .registry
            .send_to_user(user_id, &ServerEvent::GetNotifications { notifications })
            .await;
    }
    Ok(StatusCode::NO_CONTENT)
}
