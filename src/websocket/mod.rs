//! Session registry: live connections indexed by user identity and by chat
//! room. Rooms exist only for realtime fan-out and are never persisted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod events;
pub mod handlers;
pub mod router;

use events::ServerEvent;

pub type SessionId = Uuid;

struct SessionState {
    user_id: Option<Uuid>,
    rooms: HashSet<Uuid>,
    sender: UnboundedSender<ServerEvent>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, SessionState>,
    // reverse index: user -> live sessions (multi-device)
    users: HashMap<Uuid, HashSet<SessionId>>,
    // chat room -> sessions currently viewing it
    rooms: HashMap<Uuid, HashSet<SessionId>>,
}

impl Inner {
    fn drop_session(&mut self, session_id: SessionId) {
        let Some(state) = self.sessions.remove(&session_id) else {
            return;
        };
        if let Some(user_id) = state.user_id {
            if let Some(set) = self.users.get_mut(&user_id) {
                set.remove(&session_id);
                if set.is_empty() {
                    // last connection gone: the user is offline
                    self.users.remove(&user_id);
                }
            }
        }
        for room in state.rooms {
            if let Some(set) = self.rooms.get_mut(&room) {
                set.remove(&session_id);
                if set.is_empty() {
                    self.rooms.remove(&room);
                }
            }
        }
    }

    /// Send and report whether the session's channel is still alive.
    fn try_send(&self, session_id: SessionId, event: &ServerEvent) -> bool {
        match self.sessions.get(&session_id) {
            Some(state) => state.sender.send(event.clone()).is_ok(),
            None => false,
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh, still-anonymous connection.
    pub async fn register(&self, sender: UnboundedSender<ServerEvent>) -> SessionId {
        let session_id = Uuid::new_v4();
        self.inner.write().await.sessions.insert(
            session_id,
            SessionState {
                user_id: None,
                rooms: HashSet::new(),
                sender,
            },
        );
        session_id
    }

    /// Convenience for tests and in-process consumers: a registered session
    /// with its receiving end.
    pub async fn register_channel(&self) -> (SessionId, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = unbounded_channel();
        (self.register(tx).await, rx)
    }

    /// Disconnect cleanup: every room, the user reverse index, the sender.
    pub async fn unregister(&self, session_id: SessionId) {
        self.inner.write().await.drop_session(session_id);
    }

    /// Associate the connection with a user identity. Re-identifying moves
    /// the session between reverse-index buckets.
    pub async fn bind(&self, session_id: SessionId, user_id: Uuid) -> bool {
        let mut guard = self.inner.write().await;
        let Some(state) = guard.sessions.get_mut(&session_id) else {
            return false;
        };
        let previous = state.user_id.replace(user_id);
        if let Some(prev) = previous {
            if let Some(set) = guard.users.get_mut(&prev) {
                set.remove(&session_id);
                if set.is_empty() {
                    guard.users.remove(&prev);
                }
            }
        }
        guard.users.entry(user_id).or_default().insert(session_id);
        true
    }

    pub async fn user_of(&self, session_id: SessionId) -> Option<Uuid> {
        self.inner
            .read()
            .await
            .sessions
            .get(&session_id)
            .and_then(|s| s.user_id)
    }

    pub async fn join_room(&self, session_id: SessionId, chat_id: Uuid) -> bool {
        let mut guard = self.inner.write().await;
        let Some(state) = guard.sessions.get_mut(&session_id) else {
            return false;
        };
        state.rooms.insert(chat_id);
        guard.rooms.entry(chat_id).or_default().insert(session_id);
        true
    }

    pub async fn leave_room(&self, session_id: SessionId, chat_id: Uuid) {
        let mut guard = self.inner.write().await;
        if let Some(state) = guard.sessions.get_mut(&session_id) {
            state.rooms.remove(&chat_id);
        }
        if let Some(set) = guard.rooms.get_mut(&chat_id) {
            set.remove(&session_id);
            if set.is_empty() {
                guard.rooms.remove(&chat_id);
            }
        }
    }

    pub async fn is_in_room(&self, session_id: SessionId, chat_id: Uuid) -> bool {
        self.inner
            .read()
            .await
            .rooms
            .get(&chat_id)
            .is_some_and(|set| set.contains(&session_id))
    }

    /// Whether any of the user's sessions currently has the chat open.
    pub async fn user_in_room(&self, user_id: Uuid, chat_id: Uuid) -> bool {
        let guard = self.inner.read().await;
        let Some(sessions) = guard.users.get(&user_id) else {
            return false;
        };
        guard
            .rooms
            .get(&chat_id)
            .is_some_and(|room| room.iter().any(|s| sessions.contains(s)))
    }

    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .users
            .get(&user_id)
            .map_or(0, |set| set.len())
    }

    pub async fn send(&self, session_id: SessionId, event: &ServerEvent) {
        let mut guard = self.inner.write().await;
        if !guard.try_send(session_id, event) {
            guard.drop_session(session_id);
        }
    }

    pub async fn send_to_user(&self, user_id: Uuid, event: &ServerEvent) {
        let mut guard = self.inner.write().await;
        let targets: Vec<SessionId> = guard
            .users
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        for session_id in targets {
            if !guard.try_send(session_id, event) {
                guard.drop_session(session_id);
            }
        }
    }

    pub async fn send_to_room(
        &self,
        chat_id: Uuid,
        event: &ServerEvent,
        except: Option<SessionId>,
    ) {
        let mut guard = self.inner.write().await;
        let targets: Vec<SessionId> = guard
            .rooms
            .get(&chat_id)
            .map(|set| {
                set.iter()
                    .copied()
                    .filter(|s| Some(*s) != except)
                    .collect()
            })
            .unwrap_or_default();
        for session_id in targets {
            if !guard.try_send(session_id, event) {
                guard.drop_session(session_id);
            }
        }
    }

    /// Every identified session, minus all sessions of `except_user`.
    pub async fn broadcast_to_identified(&self, event: &ServerEvent, except_user: Option<Uuid>) {
        let mut guard = self.inner.write().await;
        let targets: Vec<SessionId> = guard
            .sessions
            .iter()
            .filter(|(_, s)| s.user_id.is_some() && s.user_id != except_user)
            .map(|(id, _)| *id)
            .collect();
        for session_id in targets {
            if !guard.try_send(session_id, event) {
                guard.drop_session(session_id);
            }
        }
    }
}
