//! WebSocket entrypoint and viewer connection handler.
//!
//! Upgrades HTTP to WS, attaches the connection as a subscriber (which
//! queues its history replay), and forwards events until either side goes
//! away.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tracing::{error, info, warn};

use crate::server::GatewayState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: GatewayState) {
    let (subscriber_id, mut events) = match state.registry.attach().await {
        Ok(attached) => attached,
        Err(err) => {
            error!(error = %err, "could not attach viewer, closing socket");
            return;
        }
    };
    info!(subscriber = %subscriber_id, "viewer connected");

    let (mut sender, mut receiver) = socket.split();

    // Forward events from the subscriber queue to the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "skipping unserializable event");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Viewers only listen; drain their frames until the socket closes.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // If either task exits, abort the other.
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    state.registry.detach(&subscriber_id).await;
    info!(subscriber = %subscriber_id, "viewer disconnected");
}
