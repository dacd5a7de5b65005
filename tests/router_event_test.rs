mod common;

use chat_service::services::chat_service::ChatService;
use chat_service::websocket::events::{ChatRef, ClientEvent, ServerEvent};
use chat_service::websocket::router::dispatch;
use common::{drain, kinds, open_identified_session, seed_user, test_state};
use uuid::Uuid;

fn join(chat_id: Uuid) -> ClientEvent {
    ClientEvent::JoinChat {
        chat: ChatRef { id: chat_id },
        previous_chat_id: None,
    }
}

#[tokio::test]
async fn message_updates_latest_and_fills_offline_mailbox() {
    let state = test_state();
    let u1 = seed_user(&state, "u1").await;
    let u2 = seed_user(&state, "u2").await;
    let chat = ChatService::get_or_create_direct_chat(state.store.as_ref(), u1, u2)
        .await
        .unwrap();

    let (s1, mut rx1) = open_identified_session(&state, u1).await;
    dispatch(&state, s1, join(chat.id)).await;
    drain(&mut rx1);

    // u2 is connected but not viewing the chat
    let (_s2, mut rx2) = open_identified_session(&state, u2).await;

    dispatch(
        &state,
        s1,
        ClientEvent::NewMessage {
            content: "hi".into(),
            chat_id: chat.id,
            sender_id: u1,
        },
    )
    .await;

    // latest-message pointer moved
    let resolved = state.store.resolve_chat(chat.id).await.unwrap().unwrap();
    let latest = resolved.latest_message.expect("latest message set");
    assert_eq!(latest.content, "hi");
    assert_eq!(latest.sender.id, u1);

    // the room sees history and a chat list refresh, not its own notification
    let events = drain(&mut rx1);
    assert_eq!(kinds(&events), vec!["chat_messages", "update_chatlist"]);

    // the non-viewing member gets the generic signal plus a mailbox push
    let events = drain(&mut rx2);
    assert_eq!(kinds(&events), vec!["notifications", "get_notifications"]);
    match &events[1] {
        ServerEvent::GetNotifications { notifications } => {
            assert_eq!(notifications.len(), 1);
            assert_eq!(notifications[0].chat, chat.id);
            assert_eq!(notifications[0].sender, u1);
        }
        other => panic!("unexpected event: {}", other.kind()),
    }

    let mailbox = state.store.list_notifications(u2).await.unwrap();
    assert_eq!(mailbox.len(), 1);
    assert_eq!(mailbox[0].chat, chat.id);
}

#[tokio::test]
async fn members_viewing_the_room_get_no_mailbox_entry() {
    let state = test_state();
    let u1 = seed_user(&state, "u1").await;
    let u2 = seed_user(&state, "u2").await;
    let chat = ChatService::get_or_create_direct_chat(state.store.as_ref(), u1, u2)
        .await
        .unwrap();

    let (s1, mut rx1) = open_identified_session(&state, u1).await;
    let (s2, mut rx2) = open_identified_session(&state, u2).await;
    dispatch(&state, s1, join(chat.id)).await;
    dispatch(&state, s2, join(chat.id)).await;
    drain(&mut rx1);
    drain(&mut rx2);

    dispatch(
        &state,
        s1,
        ClientEvent::NewMessage {
            content: "seen live".into(),
            chat_id: chat.id,
            sender_id: u1,
        },
    )
    .await;

    assert!(state.store.list_notifications(u2).await.unwrap().is_empty());
    let events = drain(&mut rx2);
    assert_eq!(
        kinds(&events),
        vec!["chat_messages", "update_chatlist", "notifications"]
    );
}

#[tokio::test]
async fn joining_clears_the_mailbox_and_delivers_history() {
    let state = test_state();
    let u1 = seed_user(&state, "u1").await;
    let u2 = seed_user(&state, "u2").await;
    let chat = ChatService::get_or_create_direct_chat(state.store.as_ref(), u1, u2)
        .await
        .unwrap();

    let (s1, mut rx1) = open_identified_session(&state, u1).await;
    dispatch(&state, s1, join(chat.id)).await;
    drain(&mut rx1);
    dispatch(
        &state,
        s1,
        ClientEvent::NewMessage {
            content: "hi".into(),
            chat_id: chat.id,
            sender_id: u1,
        },
    )
    .await;
    assert_eq!(state.store.list_notifications(u2).await.unwrap().len(), 1);

    let (s2, mut rx2) = open_identified_session(&state, u2).await;
    dispatch(&state, s2, join(chat.id)).await;

    assert!(state.store.list_notifications(u2).await.unwrap().is_empty());
    let events = drain(&mut rx2);
    assert_eq!(kinds(&events), vec!["get_notifications", "chat_messages"]);
    match &events[0] {
        ServerEvent::GetNotifications { notifications } => assert!(notifications.is_empty()),
        other => panic!("unexpected event: {}", other.kind()),
    }
    match &events[1] {
        ServerEvent::ChatMessages { messages, .. } => {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].content, "hi");
        }
        other => panic!("unexpected event: {}", other.kind()),
    }
}

#[tokio::test]
async fn joining_a_fresh_chat_announces_it_to_other_members_only() {
    let state = test_state();
    let u1 = seed_user(&state, "u1").await;
    let u2 = seed_user(&state, "u2").await;
    let chat = ChatService::get_or_create_direct_chat(state.store.as_ref(), u1, u2)
        .await
        .unwrap();
    assert!(chat.latest_message.is_none());

    let (s1, mut rx1) = open_identified_session(&state, u1).await;
    let (_s2, mut rx2) = open_identified_session(&state, u2).await;

    dispatch(&state, s1, join(chat.id)).await;

    // creator only sees its own history payload
    let events = drain(&mut rx1);
    assert_eq!(kinds(&events), vec!["chat_messages"]);

    let events = drain(&mut rx2);
    assert_eq!(kinds(&events), vec!["chat_created"]);
    match &events[0] {
        ServerEvent::ChatCreated { chat: announced } => assert_eq!(announced.id, chat.id),
        other => panic!("unexpected event: {}", other.kind()),
    }
}

#[tokio::test]
async fn typing_is_relayed_to_everyone_else_in_the_room() {
    let state = test_state();
    let u1 = seed_user(&state, "u1").await;
    let u2 = seed_user(&state, "u2").await;
    let u3 = seed_user(&state, "u3").await;
    let chat = ChatService::create_group_chat(state.store.as_ref(), u1, "team", &[u2, u3])
        .await
        .unwrap();

    let (s1, mut rx1) = open_identified_session(&state, u1).await;
    let (s2, mut rx2) = open_identified_session(&state, u2).await;
    let (s3, mut rx3) = open_identified_session(&state, u3).await;
    for s in [s1, s2, s3] {
        dispatch(&state, s, join(chat.id)).await;
    }
    drain(&mut rx1);
    drain(&mut rx2);
    drain(&mut rx3);

    dispatch(&state, s1, ClientEvent::Typing { chat_id: chat.id }).await;
    dispatch(&state, s1, ClientEvent::StopTyping { chat_id: chat.id }).await;

    // never echoed to the typist
    assert!(drain(&mut rx1).is_empty());
    for rx in [&mut rx2, &mut rx3] {
        let events = drain(rx);
        assert_eq!(kinds(&events), vec!["typing", "stop_typing"]);
    }
}

#[tokio::test]
async fn typing_outside_the_room_is_ignored() {
    let state = test_state();
    let u1 = seed_user(&state, "u1").await;
    let u2 = seed_user(&state, "u2").await;
    let chat = ChatService::get_or_create_direct_chat(state.store.as_ref(), u1, u2)
        .await
        .unwrap();

    let (s1, _rx1) = open_identified_session(&state, u1).await;
    let (s2, mut rx2) = open_identified_session(&state, u2).await;
    dispatch(&state, s2, join(chat.id)).await;
    drain(&mut rx2);

    // s1 never joined the room
    dispatch(&state, s1, ClientEvent::Typing { chat_id: chat.id }).await;
    assert!(drain(&mut rx2).is_empty());
}

#[tokio::test]
async fn delete_chat_removes_record_and_every_mailbox_entry() {
    let state = test_state();
    let u1 = seed_user(&state, "u1").await;
    let u2 = seed_user(&state, "u2").await;
    let chat = ChatService::get_or_create_direct_chat(state.store.as_ref(), u1, u2)
        .await
        .unwrap();

    let (s1, mut rx1) = open_identified_session(&state, u1).await;
    dispatch(&state, s1, join(chat.id)).await;
    drain(&mut rx1);
    dispatch(
        &state,
        s1,
        ClientEvent::NewMessage {
            content: "bye".into(),
            chat_id: chat.id,
            sender_id: u1,
        },
    )
    .await;
    drain(&mut rx1);
    assert_eq!(state.store.list_notifications(u2).await.unwrap().len(), 1);

    let (_s2, mut rx2) = open_identified_session(&state, u2).await;
    dispatch(&state, s1, ClientEvent::DeleteChat { chat_id: chat.id }).await;

    assert!(state.store.find_chat(chat.id).await.unwrap().is_none());
    assert!(state.store.list_notifications(u2).await.unwrap().is_empty());

    let events = drain(&mut rx1);
    assert_eq!(kinds(&events), vec!["chat_deleted"]);
    // the affected user's badge is refreshed
    let events = drain(&mut rx2);
    assert_eq!(kinds(&events), vec!["get_notifications"]);
}

#[tokio::test]
async fn add_notification_event_feeds_each_receiver() {
    let state = test_state();
    let u1 = seed_user(&state, "u1").await;
    let u2 = seed_user(&state, "u2").await;
    let u3 = seed_user(&state, "u3").await;
    let chat_id = Uuid::new_v4();
    let message_id = Uuid::new_v4();

    let (s1, _rx1) = open_identified_session(&state, u1).await;
    let (_s2, mut rx2) = open_identified_session(&state, u2).await;
    let (_s3, mut rx3) = open_identified_session(&state, u3).await;

    dispatch(
        &state,
        s1,
        ClientEvent::AddNotification {
            sender: Some(u1),
            receivers: vec![u2, u3],
            chat_id: Some(chat_id),
            message_id: Some(message_id),
            is_group_chat: true,
        },
    )
    .await;

    for (user, rx) in [(u2, &mut rx2), (u3, &mut rx3)] {
        let mailbox = state.store.list_notifications(user).await.unwrap();
        assert_eq!(mailbox.len(), 1);
        assert!(mailbox[0].is_group_chat);
        let events = drain(rx);
        assert_eq!(kinds(&events), vec!["get_notifications"]);
    }
}

#[tokio::test]
async fn delete_notification_event_clears_and_signals() {
    let state = test_state();
    let u1 = seed_user(&state, "u1").await;
    let u2 = seed_user(&state, "u2").await;
    let chat = ChatService::get_or_create_direct_chat(state.store.as_ref(), u1, u2)
        .await
        .unwrap();

    let (s1, mut rx1) = open_identified_session(&state, u1).await;
    dispatch(&state, s1, join(chat.id)).await;
    drain(&mut rx1);
    dispatch(
        &state,
        s1,
        ClientEvent::NewMessage {
            content: "hi".into(),
            chat_id: chat.id,
            sender_id: u1,
        },
    )
    .await;

    let (_s2, mut rx2) = open_identified_session(&state, u2).await;
    dispatch(
        &state,
        s1,
        ClientEvent::DeleteNotification {
            chat_id: chat.id,
            user_id: u2,
        },
    )
    .await;

    assert!(state.store.list_notifications(u2).await.unwrap().is_empty());
    let events = drain(&mut rx2);
    assert_eq!(kinds(&events), vec!["get_notifications"]);
}

#[tokio::test]
async fn events_from_anonymous_sessions_are_ignored() {
    let state = test_state();
    let u1 = seed_user(&state, "u1").await;
    let u2 = seed_user(&state, "u2").await;
    let chat = ChatService::get_or_create_direct_chat(state.store.as_ref(), u1, u2)
        .await
        .unwrap();

    let (session_id, mut rx) = state.registry.register_channel().await;
    dispatch(&state, session_id, join(chat.id)).await;
    dispatch(&state, session_id, ClientEvent::Typing { chat_id: chat.id }).await;

    assert!(drain(&mut rx).is_empty());
    assert!(!state.registry.is_in_room(session_id, chat.id).await);
}

#[tokio::test]
async fn empty_message_content_is_dropped_silently() {
    let state = test_state();
    let u1 = seed_user(&state, "u1").await;
    let u2 = seed_user(&state, "u2").await;
    let chat = ChatService::get_or_create_direct_chat(state.store.as_ref(), u1, u2)
        .await
        .unwrap();

    let (s1, mut rx1) = open_identified_session(&state, u1).await;
    dispatch(&state, s1, join(chat.id)).await;
    drain(&mut rx1);

    dispatch(
        &state,
        s1,
        ClientEvent::NewMessage {
            content: "   ".into(),
            chat_id: chat.id,
            sender_id: u1,
        },
    )
    .await;

    assert!(drain(&mut rx1).is_empty());
    assert!(state.store.list_messages(chat.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn multi_device_users_receive_on_every_session() {
    let state = test_state();
    let u1 = seed_user(&state, "u1").await;
    let u2 = seed_user(&state, "u2").await;
    let chat = ChatService::get_or_create_direct_chat(state.store.as_ref(), u1, u2)
        .await
        .unwrap();

    let (s1, mut rx1) = open_identified_session(&state, u1).await;
    dispatch(&state, s1, join(chat.id)).await;
    drain(&mut rx1);

    // two devices for u2, neither viewing the chat
    let (_phone, mut rx_phone) = open_identified_session(&state, u2).await;
    let (_laptop, mut rx_laptop) = open_identified_session(&state, u2).await;

    dispatch(
        &state,
        s1,
        ClientEvent::NewMessage {
            content: "ping".into(),
            chat_id: chat.id,
            sender_id: u1,
        },
    )
    .await;

    for rx in [&mut rx_phone, &mut rx_laptop] {
        let events = drain(rx);
        assert_eq!(kinds(&events), vec!["notifications", "get_notifications"]);
    }
    // one device online still means exactly one mailbox entry
    assert_eq!(state.store.list_notifications(u2).await.unwrap().len(), 1);
}
