//! WebSocket connection lifecycle.
//!
//! One socket per client. Outbound traffic goes through an unbounded
//! channel drained by a writer task; inbound frames are decoded and handed
//! to the session layer. A closing socket is the disconnect signal.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::http::routes::AppState;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::session::{self, ConnBinding, ConnCtx};

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else {
                continue;
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let conn = ConnCtx {
        id: Uuid::new_v4(),
        tx,
    };
    let _ = conn.tx.send(ServerMessage::Welcome {
        connection_id: conn.id.to_string(),
    });

    let mut binding: Option<ConnBinding> = None;
    while let Some(Ok(msg)) = ws_rx.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(inbound) => {
                    session::handle_message(&state.rooms, &conn, &mut binding, inbound)
                }
                Err(err) => {
                    let _ = conn.tx.send(ServerMessage::Error {
                        message: format!("bad message: {err}"),
                    });
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    debug!(conn = %conn.id, "socket closed");
    session::handle_disconnect(&state.rooms, binding.take(), conn.id);
}
