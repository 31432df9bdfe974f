//! WebSocket connection handlers.
//!
//! Each socket gets a reader task and a writer task. The writer drains the
//! connection's outbound queue; the hub holds the only strong sender of that
//! queue, so an eviction, a supersede or a logout ends the writer and with it
//! the socket.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::sync::mpsc;

use crate::{
    codec::Envelope,
    domain::{ChatId, ErrorClass, UserId},
    telemetry,
    ui::{extractor::AuthenticatedUser, state::AppState},
    usecase::ChatError,
};

/// Admission: the token is validated before the upgrade is accepted.
pub async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    tracing::info!("WebSocket upgrade accepted for {}", user.user_id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, user.user_id))
}

/// Drain the outbound queue into the socket until the queue closes or a send fails.
fn pusher_loop(
    mut rx: mpsc::Receiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    })
}

fn reader_loop(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    user_id: UserId,
    replies: mpsc::WeakSender<String>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("WebSocket error for {}: {}", user_id, e);
                    break;
                }
            };

            match message {
                Message::Text(text) => {
                    if let Err(reply) = dispatch(&state, &user_id, text.as_str()).await {
                        send_reply(&replies, &user_id, &reply);
                    }
                }
                Message::Close(_) => {
                    tracing::info!("{} requested close", user_id);
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => {
                    send_reply(
                        &replies,
                        &user_id,
                        &Envelope::error("Binary frames are not supported", None),
                    );
                }
            }
        }
    })
}

/// Queue an error envelope for the connection's own client, without waiting.
fn send_reply(replies: &mpsc::WeakSender<String>, user_id: &UserId, reply: &Envelope) {
    let Some(tx) = replies.upgrade() else {
        return;
    };
    match reply.to_json() {
        Ok(payload) => {
            if tx.try_send(payload).is_err() {
                tracing::debug!("dropping error reply to {}: queue unavailable", user_id);
            }
        }
        Err(e) => tracing::error!("failed to encode error reply: {}", e),
    }
}

/// Apply one inbound frame. The `Err` value is the error envelope to send back.
pub(crate) async fn dispatch(state: &AppState, user_id: &UserId, text: &str) -> Result<(), Envelope> {
    let envelope = Envelope::from_json(text).map_err(|e| {
        tracing::warn!("invalid message format from {}: {}", user_id, e);
        Envelope::error_with_details("Invalid message format", None, e.to_string())
    })?;

    match envelope {
        Envelope::Join(join) => state
            .join_chat_usecase
            .execute(user_id.clone(), join.chat_id)
            .await
            .map_err(|e| error_reply(user_id, e, join.chat_id)),
        Envelope::ChatMessage(message) => {
            let chat_id = message.chat_id;
            state
                .send_message_usecase
                .execute(user_id.clone(), chat_id, message.content)
                .await
                .map_err(|e| error_reply(user_id, e, chat_id))
        }
        other => {
            tracing::warn!("unsupported inbound type '{}' from {}", other.kind(), user_id);
            Err(Envelope::error(
                format!("Unsupported message type: {}", other.kind()),
                other.chat_id(),
            ))
        }
    }
}

fn error_reply(user_id: &UserId, error: ChatError, chat_id: ChatId) -> Envelope {
    if error.is_storage_failure() {
        telemetry::record_database_error();
    }
    match error.class() {
        ErrorClass::TransientBackend => {
            tracing::error!("request from {} failed: {}", user_id, error);
            Envelope::error("Internal server error", Some(chat_id))
        }
        _ => {
            tracing::warn!("request from {} rejected: {}", user_id, error);
            Envelope::error(error.to_string(), Some(chat_id))
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let (sender, receiver) = socket.split();

    let (tx, rx) = mpsc::channel(state.outbox_capacity);
    let replies = tx.downgrade();
    let connection_id = match state.hub.register(user_id.clone(), tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("failed to register {}: {}", user_id, e);
            return;
        }
    };

    let mut send_task = pusher_loop(rx, sender);
    let mut recv_task = reader_loop(receiver, state.clone(), user_id.clone(), replies);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    if let Err(e) = state.hub.unregister(user_id.clone(), connection_id).await {
        tracing::warn!("failed to unregister {} ({}): {}", user_id, connection_id, e);
    }
    tracing::info!("{} disconnected ({})", user_id, connection_id);
}
