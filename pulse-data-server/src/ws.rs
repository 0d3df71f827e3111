//! WebSocket push surface.
//!
//! Subscribers receive the latest cached bundle immediately on connect,
//! then every publisher tick. Slow clients that lag the broadcast buffer
//! skip ahead rather than being disconnected.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use pulse_data::MarketBundle;

use crate::state::AppState;

#[derive(Serialize)]
struct UpdateMessage<'a> {
    r#type: &'static str,
    data: &'a MarketBundle,
}

/// Serialise a bundle into the wire frame pushed to subscribers.
pub fn update_json(bundle: &MarketBundle) -> serde_json::Result<String> {
    serde_json::to_string(&UpdateMessage {
        r#type: "crypto_update",
        data: bundle,
    })
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.updates.subscribe();

    info!("WebSocket subscriber connected");

    // First paint: push the latest cached bundle instead of making the
    // client wait up to a full publisher tick.
    if let Some(bundle) = state.relay.cached() {
        match update_json(&bundle) {
            Ok(json) => {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            Err(error) => warn!(%error, "failed to serialise initial bundle"),
        }
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged, continuing");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_)) => {
                    // Pong is sent by the library; nothing to do.
                    debug!("subscriber ping");
                }
                Ok(_) => {}
                Err(error) => {
                    debug!(%error, "subscriber receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut recv_task => {}
    }
    send_task.abort();
    recv_task.abort();

    info!("WebSocket subscriber disconnected");
}
