use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;

use super::AppState;
use crate::monitor::MonitorHandle;
use crate::state::InitialView;

#[derive(Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
enum Greeting {
    Initial(InitialView),
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    AcknowledgeAlert { alert_id: String },
}

pub(super) async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state.monitor))
}

async fn serve_socket(socket: WebSocket, monitor: MonitorHandle) {
    // subscribe first so nothing published after the snapshot is missed
    let mut events = monitor.subscribe();
    let (mut sender, mut receiver) = socket.split();

    let initial = match monitor.initial().await {
        Ok(view) => Greeting::Initial(view),
        Err(e) => {
            tracing::warn!("dropping websocket client: {}", e);
            return;
        }
    };
    let Ok(text) = serde_json::to_string(&initial) else {
        return;
    };
    if sender.send(Message::Text(text)).await.is_err() {
        return;
    }
    tracing::info!("websocket client connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!("failed to encode event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("websocket client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => handle_client_message(&monitor, &text).await,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!("websocket client disconnected");
}

async fn handle_client_message(monitor: &MonitorHandle, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::AcknowledgeAlert { alert_id }) => {
            match monitor.acknowledge(alert_id.as_str()).await {
                Ok(true) => {}
                Ok(false) => tracing::debug!("acknowledge for unknown alert {}", alert_id),
                Err(e) => tracing::warn!("acknowledge failed: {}", e),
            }
        }
        Err(e) => tracing::warn!("invalid websocket message: {}", e),
    }
}
