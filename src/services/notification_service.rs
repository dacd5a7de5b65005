//! Per-user notification mailbox: durable unread-message markers,
//! independent of realtime connectivity.

use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Notification;
use crate::store::Store;

/// Partially-filled payload from a client. `append` refuses to store it
/// unless sender, chat and message are all present.
#[derive(Debug, Clone, Default)]
pub struct PendingNotification {
    pub sender: Option<Uuid>,
    pub chat: Option<Uuid>,
    pub message: Option<Uuid>,
    pub is_group_chat: bool,
}

pub struct NotificationService;

impl NotificationService {
    /// Append to the user's mailbox. A payload missing any required field is
    /// silently ignored rather than rejected; clients fire and forget on
    /// this path. Returns whether a new entry was stored.
    pub async fn append(
        store: &dyn Store,
        user_id: Uuid,
        pending: PendingNotification,
    ) -> AppResult<bool> {
        let (Some(sender), Some(chat), Some(message)) =
            (pending.sender, pending.chat, pending.message)
        else {
            tracing::debug!(%user_id, "dropping incomplete notification payload");
            return Ok(false);
        };
        store
            .push_notification(
                user_id,
                Notification::new(sender, chat, message, pending.is_group_chat),
            )
            .await
    }

    pub async fn list_for(store: &dyn Store, user_id: Uuid) -> AppResult<Vec<Notification>> {
        store.list_notifications(user_id).await
    }

    /// Clear the user's entries for one chat; invoked when the user opens
    /// that chat. Returns the number of removed entries.
    pub async fn remove_for_chat(
        store: &dyn Store,
        user_id: Uuid,
        chat_id: Uuid,
    ) -> AppResult<u64> {
        store.remove_notifications_for_chat(user_id, chat_id).await
    }

    /// Chat-deletion cascade. Returns the users whose mailbox changed.
    pub async fn remove_for_chat_all_users(
        store: &dyn Store,
        chat_id: Uuid,
    ) -> AppResult<Vec<Uuid>> {
        store.remove_notifications_for_chat_all_users(chat_id).await
    }
}
