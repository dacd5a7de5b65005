use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unread-message marker in a user's mailbox. One entry per unread message;
/// the store refuses a second entry for the same `(user, message)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub sender: Uuid,
    pub chat: Uuid,
    pub message: Uuid,
    pub is_group_chat: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(sender: Uuid, chat: Uuid, message: Uuid, is_group_chat: bool) -> Self {
        Self {
            sender,
            chat,
            message,
            is_group_chat,
            created_at: Utc::now(),
        }
    }
}
