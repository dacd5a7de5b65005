use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::models::Notification;
use crate::services::notification_service::{NotificationService, PendingNotification};
use crate::state::AppState;

/// GET /api/notification — the requester's mailbox in insertion order.
pub async fn fetch_notifications(
    State(state): State<AppState>,
    user: User,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = NotificationService::list_for(state.store.as_ref(), user.id).await?;
    Ok(Json(notifications))
}

#[derive(Deserialize)]
pub struct AddNotificationRequest {
    #[serde(default)]
    pub sender: Option<Uuid>,
    #[serde(default)]
    pub receivers: Vec<Uuid>,
    #[serde(default)]
    pub chat_id: Option<Uuid>,
    #[serde(default)]
    pub message_id: Option<Uuid>,
    #[serde(default)]
    pub is_group_chat: bool,
}

#[derive(Serialize)]
pub struct AddNotificationResponse {
    pub success: bool,
    pub stored: usize,
}

/// POST /api/notification — fire-and-forget append for each receiver.
/// Incomplete payloads are silently ignored, mirroring the socket path.
pub async fn add_notification(
    State(state): State<AppState>,
    _user: User,
    Json(body): Json<AddNotificationRequest>,
) -> Result<(StatusCode, Json<AddNotificationResponse>), AppError> {
    let mut stored = 0;
    for receiver in &body.receivers {
        let appended = NotificationService::append(
            state.store.as_ref(),
            *receiver,
            PendingNotification {
                sender: body.sender,
                chat: body.chat_id,
                message: body.message_id,
                is_group_chat: body.is_group_chat,
            },
        )
        .await?;
        if appended {
            stored += 1;
        }
    }
    Ok((
        StatusCode::CREATED,
        Json(AddNotificationResponse {
            success: true,
            stored,
        }),
    ))
}
