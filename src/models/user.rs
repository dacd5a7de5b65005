use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display profile of a user. Registration and authentication live in the
/// auth service; this crate only resolves profiles for chat payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}
