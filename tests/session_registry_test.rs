mod common;

use chat_service::websocket::events::ServerEvent;
use chat_service::websocket::SessionRegistry;
use common::drain;
use uuid::Uuid;

fn ping(chat_id: Uuid) -> ServerEvent {
    ServerEvent::ChatDeleted { chat_id }
}

#[tokio::test]
async fn bind_tracks_every_device_of_a_user() {
    let registry = SessionRegistry::new();
    let user = Uuid::new_v4();

    let (phone, mut phone_rx) = registry.register_channel().await;
    let (laptop, mut laptop_rx) = registry.register_channel().await;
    assert!(registry.bind(phone, user).await);
    assert!(registry.bind(laptop, user).await);
    assert_eq!(registry.connection_count(user).await, 2);

    let chat_id = Uuid::new_v4();
    registry.send_to_user(user, &ping(chat_id)).await;
    assert_eq!(drain(&mut phone_rx).len(), 1);
    assert_eq!(drain(&mut laptop_rx).len(), 1);
}

#[tokio::test]
async fn rebinding_moves_the_session_between_users() {
    let registry = SessionRegistry::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let (session, mut rx) = registry.register_channel().await;
    registry.bind(session, alice).await;
    registry.bind(session, bob).await;

    assert_eq!(registry.user_of(session).await, Some(bob));
    assert_eq!(registry.connection_count(alice).await, 0);
    assert_eq!(registry.connection_count(bob).await, 1);

    registry.send_to_user(alice, &ping(Uuid::new_v4())).await;
    assert!(drain(&mut rx).is_empty());
    registry.send_to_user(bob, &ping(Uuid::new_v4())).await;
    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test]
async fn bind_to_unknown_session_fails() {
    let registry = SessionRegistry::new();
    assert!(!registry.bind(Uuid::new_v4(), Uuid::new_v4()).await);
}

#[tokio::test]
async fn unregister_cleans_rooms_and_user_index() {
    let registry = SessionRegistry::new();
    let user = Uuid::new_v4();
    let chat_id = Uuid::new_v4();

    let (session, _rx) = registry.register_channel().await;
    registry.bind(session, user).await;
    registry.join_room(session, chat_id).await;
    assert!(registry.user_in_room(user, chat_id).await);

    registry.unregister(session).await;
    assert_eq!(registry.connection_count(user).await, 0);
    assert!(!registry.is_in_room(session, chat_id).await);
    assert!(!registry.user_in_room(user, chat_id).await);
    assert_eq!(registry.user_of(session).await, None);
}

#[tokio::test]
async fn room_membership_is_per_session_not_per_user() {
    let registry = SessionRegistry::new();
    let user = Uuid::new_v4();
    let chat_id = Uuid::new_v4();

    let (phone, _phone_rx) = registry.register_channel().await;
    let (laptop, _laptop_rx) = registry.register_channel().await;
    registry.bind(phone, user).await;
    registry.bind(laptop, user).await;

    registry.join_room(phone, chat_id).await;
    assert!(registry.is_in_room(phone, chat_id).await);
    assert!(!registry.is_in_room(laptop, chat_id).await);
    // one open device is enough to count the user as viewing
    assert!(registry.user_in_room(user, chat_id).await);

    registry.leave_room(phone, chat_id).await;
    assert!(!registry.user_in_room(user, chat_id).await);
}

#[tokio::test]
async fn room_send_honors_the_exclusion() {
    let registry = SessionRegistry::new();
    let chat_id = Uuid::new_v4();

    let (a, mut a_rx) = registry.register_channel().await;
    let (b, mut b_rx) = registry.register_channel().await;
    registry.join_room(a, chat_id).await;
    registry.join_room(b, chat_id).await;

    registry.send_to_room(chat_id, &ping(chat_id), Some(a)).await;
    assert!(drain(&mut a_rx).is_empty());
    assert_eq!(drain(&mut b_rx).len(), 1);
}

#[tokio::test]
async fn broadcast_skips_anonymous_sessions_and_the_excluded_user() {
    let registry = SessionRegistry::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let (a, mut a_rx) = registry.register_channel().await;
    let (b, mut b_rx) = registry.register_channel().await;
    let (_anon, mut anon_rx) = registry.register_channel().await;
    registry.bind(a, alice).await;
    registry.bind(b, bob).await;

    registry
        .broadcast_to_identified(&ping(Uuid::new_v4()), Some(alice))
        .await;
    assert!(drain(&mut a_rx).is_empty());
    assert_eq!(drain(&mut b_rx).len(), 1);
    assert!(drain(&mut anon_rx).is_empty());
}

#[tokio::test]
async fn sessions_with_a_closed_channel_are_evicted_on_send() {
    let registry = SessionRegistry::new();
    let user = Uuid::new_v4();

    let (session, rx) = registry.register_channel().await;
    registry.bind(session, user).await;
    drop(rx);

    registry.send_to_user(user, &ping(Uuid::new_v4())).await;
    assert_eq!(registry.connection_count(user).await, 0);
    assert_eq!(registry.user_of(session).await, None);
}
