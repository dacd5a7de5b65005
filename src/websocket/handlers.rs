use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::state::AppState;

use super::events::ClientEvent;
use super::router;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (session_id, mut rx) = state.registry.register_channel().await;
    debug!(%session_id, "realtime session opened");

    loop {
        tokio::select! {
            // outbound events routed to this session
            maybe = rx.recv() => {
                match maybe {
                    Some(event) => match serde_json::to_string(&event) {
                        Ok(text) => {
                            if sink.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(event = event.kind(), error = %e, "failed to serialize outbound event");
                        }
                    },
                    None => break,
                }
            }

            // inbound client frames
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => router::dispatch(&state, session_id, event).await,
                            // malformed payloads are dropped, never fatal
                            Err(e) => debug!(%session_id, error = %e, "unparseable client event dropped"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong handled by axum
                    Some(Err(e)) => {
                        debug!(%session_id, error = %e, "socket error");
                        break;
                    }
                }
            }
        }
    }

    state.registry.unregister(session_id).await;
    debug!(%session_id, "realtime session closed");
}
