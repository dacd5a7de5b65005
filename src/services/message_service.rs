use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::MessageDetails;
use crate::store::Store;

pub struct MessageService;

impl MessageService {
    /// Persist a message and move the chat's latest-message pointer.
    pub async fn send_message(
        store: &dyn Store,
        sender_id: Uuid,
        chat_id: Uuid,
        content: &str,
    ) -> AppResult<MessageDetails> {
        if content.trim().is_empty() {
            return Err(AppError::Validation("message content is required".into()));
        }
        let message = store.create_message(sender_id, chat_id, content).await?;
        store.set_latest_message(chat_id, message.id).await?;
        Ok(message)
    }

    pub async fn chat_history(store: &dyn Store, chat_id: Uuid) -> AppResult<Vec<MessageDetails>> {
        store.list_messages(chat_id).await
    }
}
