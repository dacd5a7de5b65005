//! Postgres persistence gateway over sqlx. Uniqueness is enforced at the
//! storage layer: `chats.direct_key` (unique) for the one-direct-chat-per-
//! pair invariant, the `(chat_id, user_id)` primary key for member set
//! semantics, and `(user_id, message)` for mailbox dedupe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Chat, ChatDetails, MessageDetails, Notification, UserProfile};

use super::Store;

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn map_unique(e: sqlx::Error, what: &str) -> AppError {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(format!("{what} already exists"))
            }
            other => AppError::Database(other),
        }
    }

    fn profile_from_row(row: &sqlx::postgres::PgRow, prefix: &str) -> UserProfile {
        UserProfile {
            id: row.get(format!("{prefix}id").as_str()),
            name: row.get(format!("{prefix}name").as_str()),
            email: row.get(format!("{prefix}email").as_str()),
            avatar_url: row.get(format!("{prefix}avatar_url").as_str()),
        }
    }

    async fn fetch_chat(&self, id: Uuid) -> AppResult<Option<Chat>> {
        let Some(row) = sqlx::query(
            "SELECT id, chat_name, is_group_chat, creator, latest_message, created_at, updated_at
             FROM chats WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let users: Vec<Uuid> = sqlx::query(
            "SELECT user_id FROM chat_members WHERE chat_id = $1 ORDER BY joined_at ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| r.get("user_id"))
        .collect();

        Ok(Some(Chat {
            id: row.get("id"),
            chat_name: row.get("chat_name"),
            is_group_chat: row.get("is_group_chat"),
            users,
            creator: row.get("creator"),
            latest_message: row.get("latest_message"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn fetch_message(&self, id: Uuid) -> AppResult<Option<MessageDetails>> {
        let row = sqlx::query(
            "SELECT m.id, m.content, m.chat, m.created_at,
                    u.id AS sender_id, u.name AS sender_name,
                    u.email AS sender_email, u.avatar_url AS sender_avatar_url
             FROM messages m JOIN users u ON u.id = m.sender
             WHERE m.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| MessageDetails {
            id: r.get("id"),
            sender: Self::profile_from_row(&r, "sender_"),
            content: r.get("content"),
            chat: r.get("chat"),
            created_at: r.get("created_at"),
        }))
    }

    async fn resolve(&self, chat: Chat) -> AppResult<ChatDetails> {
        let rows = sqlx::query(
            "SELECT u.id, u.name, u.email, u.avatar_url
             FROM chat_members cm JOIN users u ON u.id = cm.user_id
             WHERE cm.chat_id = $1 ORDER BY cm.joined_at ASC",
        )
        .bind(chat.id)
        .fetch_all(&self.pool)
        .await?;
        let users = rows
            .iter()
            .map(|r| Self::profile_from_row(r, ""))
            .collect::<Vec<_>>();

        let creator = sqlx::query("SELECT id, name, email, avatar_url FROM users WHERE id = $1")
            .bind(chat.creator)
            .fetch_optional(&self.pool)
            .await?
            .map(|r| Self::profile_from_row(&r, ""))
            .ok_or(AppError::NotFound("user"))?;

        let latest_message = match chat.latest_message {
            Some(id) => self.fetch_message(id).await?,
            None => None,
        };

        Ok(ChatDetails {
            id: chat.id,
            chat_name: chat.chat_name,
            is_group_chat: chat.is_group_chat,
            users,
            creator,
            latest_message,
            updated_at: chat.updated_at,
        })
    }

    async fn resolve_by_id(&self, id: Uuid) -> AppResult<Option<ChatDetails>> {
        match self.fetch_chat(id).await? {
            Some(chat) => Ok(Some(self.resolve(chat).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_user(&self, user: UserProfile) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, avatar_url) VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO UPDATE SET name = $2, email = $3, avatar_url = $4",
        )
        .bind(user.id)
        .bind(user.name)
        .bind(user.email)
        .bind(user.avatar_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query("SELECT id, name, email, avatar_url FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Self::profile_from_row(&r, "")))
    }

    async fn find_chat(&self, id: Uuid) -> AppResult<Option<Chat>> {
        self.fetch_chat(id).await
    }

    async fn resolve_chat(&self, id: Uuid) -> AppResult<Option<ChatDetails>> {
        self.resolve_by_id(id).await
    }

    async fn find_direct_chat(&self, a: Uuid, b: Uuid) -> AppResult<Option<ChatDetails>> {
        let key = Chat::direct_key(a, b);
        let row = sqlx::query("SELECT id FROM chats WHERE direct_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => self.resolve_by_id(r.get("id")).await,
            None => Ok(None),
        }
    }

    async fn create_direct_chat(&self, creator: Uuid, other: Uuid) -> AppResult<ChatDetails> {
        let id = Uuid::new_v4();
        let key = Chat::direct_key(creator, other);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO chats (id, chat_name, is_group_chat, creator, direct_key)
             VALUES ($1, 'sender', FALSE, $2, $3)",
        )
        .bind(id)
        .bind(creator)
        .bind(&key)
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::map_unique(e, "direct chat"))?;

        sqlx::query(
            "INSERT INTO chat_members (chat_id, user_id) VALUES ($1, $2), ($1, $3)
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(creator)
        .bind(other)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.resolve_by_id(id)
            .await?
            .ok_or(AppError::NotFound("chat"))
    }

    async fn create_group_chat(
        &self,
        creator: Uuid,
        name: &str,
        members: &[Uuid],
    ) -> AppResult<ChatDetails> {
        let id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO chats (id, chat_name, is_group_chat, creator) VALUES ($1, $2, TRUE, $3)",
        )
        .bind(id)
        .bind(name)
        .bind(creator)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO chat_members (chat_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(creator)
        .execute(&mut *tx)
        .await?;
        for member in members {
            sqlx::query(
                "INSERT INTO chat_members (chat_id, user_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(member)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.resolve_by_id(id)
            .await?
            .ok_or(AppError::NotFound("chat"))
    }

    async fn list_chats_for_user(&self, user_id: Uuid) -> AppResult<Vec<ChatDetails>> {
        let ids: Vec<Uuid> = sqlx::query(
            "SELECT c.id FROM chats c JOIN chat_members cm ON cm.chat_id = c.id
             WHERE cm.user_id = $1 ORDER BY c.updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| r.get("id"))
        .collect();

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(details) = self.resolve_by_id(id).await? {
                out.push(details);
            }
        }
        Ok(out)
    }

    async fn rename_chat(&self, chat_id: Uuid, name: &str) -> AppResult<Option<ChatDetails>> {
        let result =
            sqlx::query("UPDATE chats SET chat_name = $2, updated_at = now() WHERE id = $1")
                .bind(chat_id)
                .bind(name)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.resolve_by_id(chat_id).await
    }

    async fn add_chat_member(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<ChatDetails>> {
        if self.fetch_chat(chat_id).await?.is_none() {
            return Ok(None);
        }
        let inserted = sqlx::query(
            "INSERT INTO chat_members (chat_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if inserted.rows_affected() > 0 {
            sqlx::query("UPDATE chats SET updated_at = now() WHERE id = $1")
                .bind(chat_id)
                .execute(&self.pool)
                .await?;
        }
        self.resolve_by_id(chat_id).await
    }

    async fn remove_chat_member(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<ChatDetails>> {
        if self.fetch_chat(chat_id).await?.is_none() {
            return Ok(None);
        }
        sqlx::query("DELETE FROM chat_members WHERE chat_id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        sqlx::query("UPDATE chats SET updated_at = now() WHERE id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        self.resolve_by_id(chat_id).await
    }

    async fn delete_chat(&self, chat_id: Uuid) -> AppResult<bool> {
        // members and messages go with the chat via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_latest_message(&self, chat_id: Uuid, message_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE chats SET latest_message = $2, updated_at = now() WHERE id = $1",
        )
        .bind(chat_id)
        .bind(message_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("chat"));
        }
        Ok(())
    }

    async fn create_message(
        &self,
        sender: Uuid,
        chat: Uuid,
        content: &str,
    ) -> AppResult<MessageDetails> {
        let id = Uuid::new_v4();
        let created_at: DateTime<Utc> = sqlx::query(
            "INSERT INTO messages (id, sender, chat, content) VALUES ($1, $2, $3, $4)
             RETURNING created_at",
        )
        .bind(id)
        .bind(sender)
        .bind(chat)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map(|r| r.get("created_at"))
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                AppError::NotFound("chat")
            }
            other => AppError::Database(other),
        })?;

        let profile = self
            .find_user(sender)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        Ok(MessageDetails {
            id,
            sender: profile,
            content: content.to_string(),
            chat,
            created_at,
        })
    }

    async fn list_messages(&self, chat: Uuid) -> AppResult<Vec<MessageDetails>> {
        let rows = sqlx::query(
            "SELECT m.id, m.content, m.chat, m.created_at,
                    u.id AS sender_id, u.name AS sender_name,
                    u.email AS sender_email, u.avatar_url AS sender_avatar_url
             FROM messages m JOIN users u ON u.id = m.sender
             WHERE m.chat = $1 ORDER BY m.created_at ASC",
        )
        .bind(chat)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| MessageDetails {
                id: r.get("id"),
                sender: Self::profile_from_row(r, "sender_"),
                content: r.get("content"),
                chat: r.get("chat"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    async fn push_notification(
        &self,
        user_id: Uuid,
        notification: Notification,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO notifications (id, user_id, sender, chat, message, is_group_chat)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (user_id, message) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(notification.sender)
        .bind(notification.chat)
        .bind(notification.message)
        .bind(notification.is_group_chat)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_notifications(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT sender, chat, message, is_group_chat, created_at
             FROM notifications WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| Notification {
                sender: r.get("sender"),
                chat: r.get("chat"),
                message: r.get("message"),
                is_group_chat: r.get("is_group_chat"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    async fn remove_notifications_for_chat(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
    ) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1 AND chat = $2")
            .bind(user_id)
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn remove_notifications_for_chat_all_users(&self, chat_id: Uuid)
        -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query("DELETE FROM notifications WHERE chat = $1 RETURNING user_id")
            .bind(chat_id)
            .fetch_all(&self.pool)
            .await?;

        let mut affected: Vec<Uuid> = Vec::new();
        for row in rows {
            let user_id: Uuid = row.get("user_id");
            if !affected.contains(&user_id) {
                affected.push(user_id);
            }
        }
        Ok(affected)
    }
}
