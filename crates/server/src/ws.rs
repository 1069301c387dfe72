//! `GET /ws/{alias}`: WebSocket transport for a streaming session.
//!
//! The socket is split: a writer task drains the session's channel into
//! text frames, and the handler watches the read half for a close frame or a
//! dropped connection. Whichever side finishes first ends the session; the
//! session's file handle is released when its future is dropped.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use ezviewer_core::StreamMessage;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::session::{run_session, SessionEnd};
use crate::AppState;

/// Messages queued between the session and the socket writer.
const OUTBOUND_CAPACITY: usize = 32;

pub async fn stream_ws(
    ws: WebSocketUpgrade,
    Path(alias): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, alias, state))
}

async fn handle_socket(socket: WebSocket, alias: String, state: AppState) {
    info!("Viewer connected: {}", alias);
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<StreamMessage>(OUTBOUND_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender
                .send(Message::Text(msg.to_json().into()))
                .await
                .is_err()
            {
                return;
            }
        }
        // Session finished on its own (e.g. unknown alias): close politely.
        let _ = ws_sender.send(Message::Close(None)).await;
    });

    let closed = async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    };

    let session = run_session(
        &alias,
        &state.registry,
        &state.config.stream,
        tx,
        state.shutdown.clone(),
    );

    let end = tokio::select! {
        end = session => end,
        _ = closed => SessionEnd::Disconnected,
    };

    // With the session gone its sender is dropped, so the writer drains and stops.
    let _ = writer.await;
    match end {
        SessionEnd::Disconnected => info!("Viewer disconnected: {}", alias),
        other => debug!("Session for {} ended: {:?}", alias, other),
    }
}
