//! WebSocket endpoint for live reload.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;

use super::LiveReloadHub;
use crate::state::AppState;

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let hub = state.live_reload.clone();
    ws.on_upgrade(move |socket| async move {
        if let Some(hub) = hub {
            forward_events(socket, &hub).await;
        }
    })
}

/// Forward hub events to one browser until either side closes.
async fn forward_events(mut socket: WebSocket, hub: &LiveReloadHub) {
    let mut receiver = hub.subscribe();
    tracing::debug!("Browser connected for live reload");

    loop {
        tokio::select! {
            result = receiver.recv() => {
                let event = match result {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Live reload client lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::warn!(error = %err, "Failed to encode live reload event");
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            // Client messages are ignored; a close or error ends the session
            result = socket.recv() => {
                if !matches!(result, Some(Ok(_))) {
                    break;
                }
            }
        }
    }

    tracing::debug!("Browser disconnected from live reload");
}
