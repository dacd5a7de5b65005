//! Wire contract of the realtime channel. The `type` tags are fixed for
//! client compatibility; renaming any of them breaks deployed clients.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatDetails, MessageDetails, Notification};

/// Reference to a chat inside a client payload. Clients send the chat
/// object they hold; only the id is trusted, everything else is re-read
/// from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRef {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "identify")]
    Identify { user_id: Uuid },

    #[serde(rename = "join_chat")]
    JoinChat {
        chat: ChatRef,
        #[serde(default)]
        previous_chat_id: Option<Uuid>,
    },

    #[serde(rename = "typing")]
    Typing { chat_id: Uuid },

    #[serde(rename = "stop_typing")]
    StopTyping { chat_id: Uuid },

    #[serde(rename = "new_message")]
    NewMessage {
        content: String,
        chat_id: Uuid,
        sender_id: Uuid,
    },

    // fields stay optional: incomplete payloads are dropped by the mailbox,
    // not rejected on the socket
    #[serde(rename = "add_notification")]
    AddNotification {
        #[serde(default)]
        sender: Option<Uuid>,
        #[serde(default)]
        receivers: Vec<Uuid>,
        #[serde(default)]
        chat_id: Option<Uuid>,
        #[serde(default)]
        message_id: Option<Uuid>,
        #[serde(default)]
        is_group_chat: bool,
    },

    #[serde(rename = "delete_chat")]
    DeleteChat { chat_id: Uuid },

    #[serde(rename = "delete_notification")]
    DeleteNotification { chat_id: Uuid, user_id: Uuid },
}

impl ClientEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Identify { .. } => "identify",
            Self::JoinChat { .. } => "join_chat",
            Self::Typing { .. } => "typing",
            Self::StopTyping { .. } => "stop_typing",
            Self::NewMessage { .. } => "new_message",
            Self::AddNotification { .. } => "add_notification",
            Self::DeleteChat { .. } => "delete_chat",
            Self::DeleteNotification { .. } => "delete_notification",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "identified")]
    Identified { user_id: Uuid },

    #[serde(rename = "chat_created")]
    ChatCreated { chat: ChatDetails },

    #[serde(rename = "chat_messages")]
    ChatMessages {
        chat_id: Uuid,
        messages: Vec<MessageDetails>,
    },

    #[serde(rename = "typing")]
    Typing { chat_id: Uuid, user_id: Uuid },

    #[serde(rename = "stop_typing")]
    StopTyping { chat_id: Uuid, user_id: Uuid },

    #[serde(rename = "update_chatlist")]
    UpdateChatList { chat_id: Uuid },

    #[serde(rename = "notifications")]
    Notifications {
        chat_id: Uuid,
        message: MessageDetails,
    },

    #[serde(rename = "get_notifications")]
    GetNotifications { notifications: Vec<Notification> },

    #[serde(rename = "chat_deleted")]
    ChatDeleted { chat_id: Uuid },
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Identified { .. } => "identified",
            Self::ChatCreated { .. } => "chat_created",
            Self::ChatMessages { .. } => "chat_messages",
            Self::Typing { .. } => "typing",
            Self::StopTyping { .. } => "stop_typing",
            Self::UpdateChatList { .. } => "update_chatlist",
            Self::Notifications { .. } => "notifications",
            Self::GetNotifications { .. } => "get_notifications",
            Self::ChatDeleted { .. } => "chat_deleted",
        }
    }
}
