//! Realtime event router: interprets inbound events, mutates the session
//! registry, invokes the chat directory / mailbox / message persistence and
//! emits outbound events to the right subset of sessions.
//!
//! Failure semantics: this channel favors availability. Malformed or failed
//! events are logged and dropped; application errors never close the
//! connection.

use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Notification;
use crate::services::chat_service::ChatService;
use crate::services::message_service::MessageService;
use crate::services::notification_service::{NotificationService, PendingNotification};
use crate::state::AppState;

use super::events::{ChatRef, ClientEvent, ServerEvent};
use super::SessionId;

pub async fn dispatch(state: &AppState, session_id: SessionId, event: ClientEvent) {
    let kind = event.kind();
    let result = match event {
        ClientEvent::Identify { user_id } => identify(state, session_id, user_id).await,
        ClientEvent::JoinChat {
            chat,
            previous_chat_id,
        } => join_chat(state, session_id, chat, previous_chat_id).await,
        ClientEvent::Typing { chat_id } => relay_typing(state, session_id, chat_id, true).await,
        ClientEvent::StopTyping { chat_id } => {
            relay_typing(state, session_id, chat_id, false).await
        }
        ClientEvent::NewMessage {
            content,
            chat_id,
            sender_id,
        } => new_message(state, content, chat_id, sender_id).await,
        ClientEvent::AddNotification {
            sender,
            receivers,
            chat_id,
            message_id,
            is_group_chat,
        } => {
            add_notification(state, sender, receivers, chat_id, message_id, is_group_chat).await
        }
        ClientEvent::DeleteChat { chat_id } => delete_chat(state, chat_id).await,
        ClientEvent::DeleteNotification { chat_id, user_id } => {
            delete_notification(state, chat_id, user_id).await
        }
    };

    if let Err(e) = result {
        // fire-and-forget transport: log with enough context to reconcile
        // offline, surface nothing to the caller
        tracing::warn!(event = kind, error = %e, "realtime event dropped");
    }
}

/// Re-read the user's mailbox and push it to their live sessions, keeping
/// unread badges consistent after every mailbox mutation.
async fn mailbox_changed(state: &AppState, user_id: Uuid) -> AppResult<()> {
    let notifications = NotificationService::list_for(state.store.as_ref(), user_id).await?;
    state
        .registry
        .send_to_user(user_id, &ServerEvent::GetNotifications { notifications })
        .await;
    Ok(())
}

async fn identify(state: &AppState, session_id: SessionId, user_id: Uuid) -> AppResult<()> {
    if state.registry.bind(session_id, user_id).await {
        state
            .registry
            .send(session_id, &ServerEvent::Identified { user_id })
            .await;
    }
    Ok(())
}

async fn join_chat(
    state: &AppState,
    session_id: SessionId,
    chat: ChatRef,
    previous_chat_id: Option<Uuid>,
) -> AppResult<()> {
    let Some(user_id) = state.registry.user_of(session_id).await else {
        tracing::debug!(chat_id = %chat.id, "join_chat from anonymous session ignored");
        return Ok(());
    };
    let Some(details) = state.store.resolve_chat(chat.id).await? else {
        tracing::debug!(chat_id = %chat.id, "join_chat for unknown chat ignored");
        return Ok(());
    };

    // freshly created chat: tell every other member it exists
    if details.latest_message.is_none() {
        for member in details.member_ids() {
            if member != details.creator.id {
                state
                    .registry
                    .send_to_user(
                        member,
                        &ServerEvent::ChatCreated {
                            chat: details.clone(),
                        },
                    )
                    .await;
            }
        }
    }

    state.registry.join_room(session_id, details.id).await;
    if let Some(previous) = previous_chat_id {
        state.registry.leave_room(session_id, previous).await;
    }

    // opening the chat consumes its unread markers
    let removed =
        NotificationService::remove_for_chat(state.store.as_ref(), user_id, details.id).await?;
    if removed > 0 {
        mailbox_changed(state, user_id).await?;
    }

    let messages = MessageService::chat_history(state.store.as_ref(), details.id).await?;
    state
        .registry
        .send(
            session_id,
            &ServerEvent::ChatMessages {
                chat_id: details.id,
                messages,
            },
        )
        .await;
    Ok(())
}

async fn relay_typing(
    state: &AppState,
    session_id: SessionId,
    chat_id: Uuid,
    started: bool,
) -> AppResult<()> {
    let Some(user_id) = state.registry.user_of(session_id).await else {
        return Ok(());
    };
    if !state.registry.is_in_room(session_id, chat_id).await {
        return Ok(());
    }
    let event = if started {
        ServerEvent::Typing { chat_id, user_id }
    } else {
        ServerEvent::StopTyping { chat_id, user_id }
    };
    state
        .registry
        .send_to_room(chat_id, &event, Some(session_id))
        .await;
    Ok(())
}

async fn new_message(
    state: &AppState,
    content: String,
    chat_id: Uuid,
    sender_id: Uuid,
) -> AppResult<()> {
    if content.trim().is_empty() {
        tracing::warn!(%chat_id, event = "new_message", "empty content dropped");
        return Ok(());
    }

    let message =
        MessageService::send_message(state.store.as_ref(), sender_id, chat_id, &content).await?;
    let Some(details) = state.store.resolve_chat(chat_id).await? else {
        tracing::warn!(%chat_id, event = "new_message", "chat vanished after persist");
        return Ok(());
    };

    // everyone viewing the chat gets the refreshed history and chat list
    let messages = MessageService::chat_history(state.store.as_ref(), chat_id).await?;
    state
        .registry
        .send_to_room(chat_id, &ServerEvent::ChatMessages { chat_id, messages }, None)
        .await;
    state
        .registry
        .send_to_room(chat_id, &ServerEvent::UpdateChatList { chat_id }, None)
        .await;

    // any client showing a chat list can update unread state
    state
        .registry
        .broadcast_to_identified(
            &ServerEvent::Notifications {
                chat_id,
                message: message.clone(),
            },
            Some(sender_id),
        )
        .await;

    // durable mailbox entry for every member not currently viewing the chat
    for member in details.member_ids() {
        if member == sender_id || state.registry.user_in_room(member, chat_id).await {
            continue;
        }
        let stored = state
            .store
            .push_notification(
                member,
                Notification::new(sender_id, chat_id, message.id, details.is_group_chat),
            )
            .await?;
        if stored {
            mailbox_changed(state, member).await?;
        }
    }

    Ok(())
}

async fn add_notification(
    state: &AppState,
    sender: Option<Uuid>,
    receivers: Vec<Uuid>,
    chat_id: Option<Uuid>,
    message_id: Option<Uuid>,
    is_group_chat: bool,
) -> AppResult<()> {
    for receiver in receivers {
        NotificationService::append(
            state.store.as_ref(),
            receiver,
            PendingNotification {
                sender,
                chat: chat_id,
                message: message_id,
                is_group_chat,
            },
        )
        .await?;
        mailbox_changed(state, receiver).await?;
    }
    Ok(())
}

async fn delete_chat(state: &AppState, chat_id: Uuid) -> AppResult<()> {
    state
        .registry
        .send_to_room(chat_id, &ServerEvent::ChatDeleted { chat_id }, None)
        .await;
    let affected = ChatService::delete_chat(state.store.as_ref(), chat_id).await?;
    for user_id in affected {
        mailbox_changed(state, user_id).await?;
    }
    Ok(())
}

async fn delete_notification(state: &AppState, chat_id: Uuid, user_id: Uuid) -> AppResult<()> {
    NotificationService::remove_for_chat(state.store.as_ref(), user_id, chat_id).await?;
    mailbox_changed(state, user_id).await
}
