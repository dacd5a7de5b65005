use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserProfile;

/// A persisted chat message. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Uuid,
    pub content: String,
    pub chat: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Message with the sender profile resolved, as sent over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDetails {
    pub id: Uuid,
    pub sender: UserProfile,
    pub content: String,
    pub chat: Uuid,
    pub created_at: DateTime<Utc>,
}
