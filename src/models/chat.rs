use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::MessageDetails;
use super::user::UserProfile;

/// Stored chat record. `users` is a set: the store deduplicates on write,
/// but insertion order is kept for group member display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub chat_name: String,
    pub is_group_chat: bool,
    pub users: Vec<Uuid>,
    pub creator: Uuid,
    pub latest_message: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.users.contains(&user_id)
    }

    /// Normalized key for the at-most-one-direct-chat constraint.
    pub fn direct_key(a: Uuid, b: Uuid) -> String {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        format!("{lo}:{hi}")
    }
}

/// Detail-resolved chat: member and creator profiles plus the latest
/// message with its sender resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDetails {
    pub id: Uuid,
    pub chat_name: String,
    pub is_group_chat: bool,
    pub users: Vec<UserProfile>,
    pub creator: UserProfile,
    pub latest_message: Option<MessageDetails>,
    pub updated_at: DateTime<Utc>,
}

impl ChatDetails {
    pub fn member_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.users.iter().map(|u| u.id)
    }
}
