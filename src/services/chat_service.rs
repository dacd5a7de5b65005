//! Chat directory: direct-chat resolution, group membership, deletion.

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::ChatDetails;
use crate::store::Store;

pub struct ChatService;

impl ChatService {
    /// Resolve the unique direct chat between requester and target,
    /// creating it when absent. The find-then-create spans an await point,
    /// so a concurrent call from the other participant can win the insert;
    /// the storage-level uniqueness constraint turns that into a conflict
    /// and we re-read instead of trusting the initial find.
    pub async fn get_or_create_direct_chat(
        store: &dyn Store,
        requester_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<ChatDetails> {
        if target_id == requester_id {
            return Err(AppError::Validation(
                "cannot open a direct chat with yourself".into(),
            ));
        }
        if store.find_user(target_id).await?.is_none() {
            return Err(AppError::NotFound("user"));
        }

        if let Some(chat) = store.find_direct_chat(requester_id, target_id).await? {
            return Ok(chat);
        }

        match store.create_direct_chat(requester_id, target_id).await {
            Ok(chat) => Ok(chat),
            Err(e) if e.is_conflict() => store
                .find_direct_chat(requester_id, target_id)
                .await?
                .ok_or(AppError::Internal),
            Err(e) => Err(e),
        }
    }

    pub async fn list_chats_for_user(
        store: &dyn Store,
        user_id: Uuid,
    ) -> AppResult<Vec<ChatDetails>> {
        store.list_chats_for_user(user_id).await
    }

    /// Creator is implicitly a member; at least two others are required, so
    /// every group chat starts with three or more members.
    pub async fn create_group_chat(
        store: &dyn Store,
        creator_id: Uuid,
        name: &str,
        member_ids: &[Uuid],
    ) -> AppResult<ChatDetails> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("group name is required".into()));
        }
        let invited: Vec<Uuid> = member_ids
            .iter()
            .copied()
            .filter(|id| *id != creator_id)
            .collect();
        if invited.len() < 2 {
            return Err(AppError::Validation(
                "more than 2 users are required to form a group chat".into(),
            ));
        }
        store.create_group_chat(creator_id, name, &invited).await
    }

    pub async fn rename_group_chat(
        store: &dyn Store,
        chat_id: Uuid,
        new_name: &str,
    ) -> AppResult<ChatDetails> {
        if new_name.trim().is_empty() {
            return Err(AppError::Validation("chat name is required".into()));
        }
        store
            .rename_chat(chat_id, new_name)
            .await?
            .ok_or(AppError::NotFound("chat"))
    }

    pub async fn add_member(
        store: &dyn Store,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<ChatDetails> {
        if store.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound("user"));
        }
        store
            .add_chat_member(chat_id, user_id)
            .await?
            .ok_or(AppError::NotFound("chat"))
    }

    pub async fn remove_member(
        store: &dyn Store,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<ChatDetails> {
        store
            .remove_chat_member(chat_id, user_id)
            .await?
            .ok_or(AppError::NotFound("chat"))
    }

    /// Delete the chat and cascade mailbox removal across every user.
    /// Returns the users whose mailbox lost entries so the caller can
    /// signal their live sessions.
    pub async fn delete_chat(store: &dyn Store, chat_id: Uuid) -> AppResult<Vec<Uuid>> {
        if !store.delete_chat(chat_id).await? {
            return Err(AppError::NotFound("chat"));
        }
        store.remove_notifications_for_chat_all_users(chat_id).await
    }
}
