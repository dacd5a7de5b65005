//! In-memory store. Every operation takes the single write lock for its
//! whole duration, so the uniqueness constraints hold without extra
//! coordination even when callers interleave at await points.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Chat, ChatDetails, Message, MessageDetails, Notification, UserProfile};

use super::Store;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserProfile>,
    chats: HashMap<Uuid, Chat>,
    // normalized pair key -> chat id, the direct-chat uniqueness constraint
    direct_index: HashMap<String, Uuid>,
    messages: HashMap<Uuid, Message>,
    // chat id -> message ids in creation order
    chat_messages: HashMap<Uuid, Vec<Uuid>>,
    mailboxes: HashMap<Uuid, Vec<Notification>>,
}

impl Inner {
    fn profile(&self, id: Uuid) -> AppResult<UserProfile> {
        self.users
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound("user"))
    }

    fn resolve_message(&self, id: Uuid) -> AppResult<Option<MessageDetails>> {
        let Some(msg) = self.messages.get(&id) else {
            return Ok(None);
        };
        Ok(Some(MessageDetails {
            id: msg.id,
            sender: self.profile(msg.sender)?,
            content: msg.content.clone(),
            chat: msg.chat,
            created_at: msg.created_at,
        }))
    }

    fn resolve(&self, chat: &Chat) -> AppResult<ChatDetails> {
        let users = chat
            .users
            .iter()
            .map(|id| self.profile(*id))
            .collect::<AppResult<Vec<_>>>()?;
        let latest_message = match chat.latest_message {
            Some(id) => self.resolve_message(id)?,
            None => None,
        };
        Ok(ChatDetails {
            id: chat.id,
            chat_name: chat.chat_name.clone(),
            is_group_chat: chat.is_group_chat,
            users,
            creator: self.profile(chat.creator)?,
            latest_message,
            updated_at: chat.updated_at,
        })
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_user(&self, user: UserProfile) -> AppResult<()> {
        self.inner.write().await.users.insert(user.id, user);
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_chat(&self, id: Uuid) -> AppResult<Option<Chat>> {
        Ok(self.inner.read().await.chats.get(&id).cloned())
    }

    async fn resolve_chat(&self, id: Uuid) -> AppResult<Option<ChatDetails>> {
        let guard = self.inner.read().await;
        match guard.chats.get(&id) {
            Some(chat) => Ok(Some(guard.resolve(chat)?)),
            None => Ok(None),
        }
    }

    async fn find_direct_chat(&self, a: Uuid, b: Uuid) -> AppResult<Option<ChatDetails>> {
        let guard = self.inner.read().await;
        let key = Chat::direct_key(a, b);
        match guard.direct_index.get(&key) {
            Some(id) => {
                let chat = guard.chats.get(id).ok_or(AppError::Internal)?;
                Ok(Some(guard.resolve(chat)?))
            }
            None => Ok(None),
        }
    }

    async fn create_direct_chat(&self, creator: Uuid, other: Uuid) -> AppResult<ChatDetails> {
        let mut guard = self.inner.write().await;
        let key = Chat::direct_key(creator, other);
        if guard.direct_index.contains_key(&key) {
            return Err(AppError::Conflict(format!("direct chat exists: {key}")));
        }
        let now = Utc::now();
        let chat = Chat {
            id: Uuid::new_v4(),
            chat_name: "sender".into(),
            is_group_chat: false,
            users: vec![creator, other],
            creator,
            latest_message: None,
            created_at: now,
            updated_at: now,
        };
        let details = guard.resolve(&chat)?;
        guard.direct_index.insert(key, chat.id);
        guard.chats.insert(chat.id, chat);
        Ok(details)
    }

    async fn create_group_chat(
        &self,
        creator: Uuid,
        name: &str,
        members: &[Uuid],
    ) -> AppResult<ChatDetails> {
        let mut guard = self.inner.write().await;
        let mut users = vec![creator];
        for id in members {
            if !users.contains(id) {
                users.push(*id);
            }
        }
        let now = Utc::now();
        let chat = Chat {
            id: Uuid::new_v4(),
            chat_name: name.to_string(),
            is_group_chat: true,
            users,
            creator,
            latest_message: None,
            created_at: now,
            updated_at: now,
        };
        let details = guard.resolve(&chat)?;
        guard.chats.insert(chat.id, chat);
        Ok(details)
    }

    async fn list_chats_for_user(&self, user_id: Uuid) -> AppResult<Vec<ChatDetails>> {
        let guard = self.inner.read().await;
        let mut chats: Vec<&Chat> = guard
            .chats
            .values()
            .filter(|c| c.is_member(user_id))
            .collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        chats.into_iter().map(|c| guard.resolve(c)).collect()
    }

    async fn rename_chat(&self, chat_id: Uuid, name: &str) -> AppResult<Option<ChatDetails>> {
        let mut guard = self.inner.write().await;
        let Some(chat) = guard.chats.get_mut(&chat_id) else {
            return Ok(None);
        };
        chat.chat_name = name.to_string();
        chat.updated_at = Utc::now();
        let chat = chat.clone();
        Ok(Some(guard.resolve(&chat)?))
    }

    async fn add_chat_member(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<ChatDetails>> {
        let mut guard = self.inner.write().await;
        let Some(chat) = guard.chats.get_mut(&chat_id) else {
            return Ok(None);
        };
        if !chat.users.contains(&user_id) {
            chat.users.push(user_id);
            chat.updated_at = Utc::now();
        }
        let chat = chat.clone();
        Ok(Some(guard.resolve(&chat)?))
    }

    async fn remove_chat_member(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<ChatDetails>> {
        let mut guard = self.inner.write().await;
        let Some(chat) = guard.chats.get_mut(&chat_id) else {
            return Ok(None);
        };
        chat.users.retain(|id| *id != user_id);
        chat.updated_at = Utc::now();
        let chat = chat.clone();
        Ok(Some(guard.resolve(&chat)?))
    }

    async fn delete_chat(&self, chat_id: Uuid) -> AppResult<bool> {
        let mut guard = self.inner.write().await;
        let Some(chat) = guard.chats.remove(&chat_id) else {
            return Ok(false);
        };
        if !chat.is_group_chat {
            guard.direct_index.retain(|_, id| *id != chat_id);
        }
        if let Some(ids) = guard.chat_messages.remove(&chat_id) {
            for id in ids {
                guard.messages.remove(&id);
            }
        }
        Ok(true)
    }

    async fn set_latest_message(&self, chat_id: Uuid, message_id: Uuid) -> AppResult<()> {
        let mut guard = self.inner.write().await;
        let chat = guard
            .chats
            .get_mut(&chat_id)
            .ok_or(AppError::NotFound("chat"))?;
        chat.latest_message = Some(message_id);
        chat.updated_at = Utc::now();
        Ok(())
    }

    async fn create_message(
        &self,
        sender: Uuid,
        chat: Uuid,
        content: &str,
    ) -> AppResult<MessageDetails> {
        let mut guard = self.inner.write().await;
        if !guard.chats.contains_key(&chat) {
            return Err(AppError::NotFound("chat"));
        }
        let profile = guard.profile(sender)?;
        let message = Message {
            id: Uuid::new_v4(),
            sender,
            content: content.to_string(),
            chat,
            created_at: Utc::now(),
        };
        let details = MessageDetails {
            id: message.id,
            sender: profile,
            content: message.content.clone(),
            chat,
            created_at: message.created_at,
        };
        guard.chat_messages.entry(chat).or_default().push(message.id);
        guard.messages.insert(message.id, message);
        Ok(details)
    }

    async fn list_messages(&self, chat: Uuid) -> AppResult<Vec<MessageDetails>> {
        let guard = self.inner.read().await;
        let Some(ids) = guard.chat_messages.get(&chat) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(details) = guard.resolve_message(*id)? {
                out.push(details);
            }
        }
        Ok(out)
    }

    async fn push_notification(
        &self,
        user_id: Uuid,
        notification: Notification,
    ) -> AppResult<bool> {
        let mut guard = self.inner.write().await;
        let mailbox = guard.mailboxes.entry(user_id).or_default();
        if mailbox.iter().any(|n| n.message == notification.message) {
            return Ok(false);
        }
        mailbox.push(notification);
        Ok(true)
    }

    async fn list_notifications(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        Ok(self
            .inner
            .read()
            .await
            .mailboxes
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn remove_notifications_for_chat(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
    ) -> AppResult<u64> {
        let mut guard = self.inner.write().await;
        let Some(mailbox) = guard.mailboxes.get_mut(&user_id) else {
            return Ok(0);
        };
        let before = mailbox.len();
        mailbox.retain(|n| n.chat != chat_id);
        Ok((before - mailbox.len()) as u64)
    }

    async fn remove_notifications_for_chat_all_users(&self, chat_id: Uuid)
        -> AppResult<Vec<Uuid>> {
        let mut guard = self.inner.write().await;
        let mut affected = Vec::new();
        for (user_id, mailbox) in guard.mailboxes.iter_mut() {
            let before = mailbox.len();
            mailbox.retain(|n| n.chat != chat_id);
            if mailbox.len() != before {
                affected.push(*user_id);
            }
        }
        Ok(affected)
    }
}
