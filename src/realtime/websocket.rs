//! WebSocket handler: authenticates the upgrade with the same bearer
//! credential as the HTTP layer, then routes room control frames.
//!
//! Connection lifecycle:
//! 1. Client opens `GET /ws/connect?token=…` — token resolved against
//!    the session registry, upgrade refused with 401 otherwise
//! 2. Client joins conversation rooms; membership is validated against
//!    the conversation store before the connection is added
//! 3. Server pushes `new_message` / `messages_read` /
//!    `conversation_locked` events for joined rooms
//! 4. On socket close the connection is removed from every room; no
//!    leave notice goes to other members

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::Identity;

use super::{ClientEvent, RoomHub};

/// Query parameters for WebSocket upgrade.
#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: String,
}

/// WebSocket upgrade handler. The bearer token travels as a query
/// parameter because browsers cannot set headers on WebSocket opens.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(ctx): State<ApiContext>,
    Query(query): Query<WsAuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = {
        let sessions = ctx
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock".into()))?;
        sessions.resolve(&query.token).ok_or(ApiError::Unauthorized)?
    };

    tracing::info!(user_id = %identity.user_id, role = identity.role.as_str(), "realtime connection accepted");
    Ok(ws.on_upgrade(move |socket| handle_ws(socket, ctx, identity)))
}

/// Main connection loop. A sender task forwards hub events to the
/// socket; the receive loop handles join/leave frames until disconnect.
async fn handle_ws(socket: WebSocket, ctx: ApiContext, identity: Identity) {
    let (ws_sink, mut ws_stream) = socket.split();
    let (tx, rx) = RoomHub::outbound_channel();
    let conn_id = ctx.chat.hub().next_connection_id();

    // Sender task (reads from channel, writes JSON frames to the socket)
    let sender_handle = tokio::spawn(async move {
        let mut sink = ws_sink;
        let mut rx = rx;
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(_) => continue,
            };
            if sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(ref text)) => {
                // Malformed or unknown frames are ignored
                let Ok(event) = serde_json::from_str::<ClientEvent>(text) else {
                    continue;
                };
                match event {
                    ClientEvent::JoinConversation { conversation_id } => {
                        match ctx.chat.is_participant(&conversation_id, &identity) {
                            Ok(true) => {
                                ctx.chat.hub().join(conversation_id, conn_id, tx.clone());
                            }
                            Ok(false) => {
                                tracing::warn!(
                                    user_id = %identity.user_id,
                                    %conversation_id,
                                    "room join refused: not a participant"
                                );
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, %conversation_id, "room join refused");
                            }
                        }
                    }
                    ClientEvent::LeaveConversation { conversation_id } => {
                        ctx.chat.hub().leave(&conversation_id, conn_id);
                    }
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {} // Ping/Pong handled by the protocol layer
        }
    }

    // Cleanup: drop sender (stops sender task), leave every room
    drop(tx);
    let _ = sender_handle.await;
    ctx.chat.hub().disconnect(conn_id);

    tracing::info!(user_id = %identity.user_id, "realtime connection closed");
}
