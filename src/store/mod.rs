//! Persistence gateway. The services and the realtime router only ever talk
//! to the [`Store`] trait; `PgStore` backs production and `MemoryStore`
//! backs tests and local runs with the same observable semantics.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Chat, ChatDetails, MessageDetails, Notification, UserProfile};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    // -- users -------------------------------------------------------------
    async fn upsert_user(&self, user: UserProfile) -> AppResult<()>;
    async fn find_user(&self, id: Uuid) -> AppResult<Option<UserProfile>>;

    // -- chats -------------------------------------------------------------
    async fn find_chat(&self, id: Uuid) -> AppResult<Option<Chat>>;
    async fn resolve_chat(&self, id: Uuid) -> AppResult<Option<ChatDetails>>;

    /// Locate the unique non-group chat whose member set is `{a, b}`.
    async fn find_direct_chat(&self, a: Uuid, b: Uuid) -> AppResult<Option<ChatDetails>>;

    /// Create a direct chat. Fails with `AppError::Conflict` when a chat for
    /// the normalized pair already exists; callers re-read on conflict.
    async fn create_direct_chat(&self, creator: Uuid, other: Uuid) -> AppResult<ChatDetails>;

    async fn create_group_chat(
        &self,
        creator: Uuid,
        name: &str,
        members: &[Uuid],
    ) -> AppResult<ChatDetails>;

    /// Chats the user is a member of, most recently updated first.
    async fn list_chats_for_user(&self, user_id: Uuid) -> AppResult<Vec<ChatDetails>>;

    async fn rename_chat(&self, chat_id: Uuid, name: &str) -> AppResult<Option<ChatDetails>>;

    /// Add a member. The member list has set semantics: adding a user who is
    /// already present leaves the chat unchanged.
    async fn add_chat_member(&self, chat_id: Uuid, user_id: Uuid)
        -> AppResult<Option<ChatDetails>>;

    async fn remove_chat_member(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<ChatDetails>>;

    /// Remove the chat record and its messages. Returns false when the chat
    /// did not exist. Mailbox cascade is a separate notification operation.
    async fn delete_chat(&self, chat_id: Uuid) -> AppResult<bool>;

    async fn set_latest_message(&self, chat_id: Uuid, message_id: Uuid) -> AppResult<()>;

    // -- messages ----------------------------------------------------------
    async fn create_message(
        &self,
        sender: Uuid,
        chat: Uuid,
        content: &str,
    ) -> AppResult<MessageDetails>;

    /// Messages of a chat in creation order, senders resolved.
    async fn list_messages(&self, chat: Uuid) -> AppResult<Vec<MessageDetails>>;

    // -- notification mailbox ----------------------------------------------
    /// Append to the user's mailbox. Returns false when an entry for the
    /// same message is already present (mailboxes never duplicate).
    async fn push_notification(&self, user_id: Uuid, notification: Notification)
        -> AppResult<bool>;

    async fn list_notifications(&self, user_id: Uuid) -> AppResult<Vec<Notification>>;

    /// Drop every mailbox entry of `user_id` referencing `chat_id`.
    /// Returns the number of removed entries.
    async fn remove_notifications_for_chat(&self, user_id: Uuid, chat_id: Uuid)
        -> AppResult<u64>;

    /// Drop every mailbox entry referencing `chat_id` across all users.
    /// Returns the ids of users whose mailbox changed.
    async fn remove_notifications_for_chat_all_users(&self, chat_id: Uuid)
        -> AppResult<Vec<Uuid>>;
}
