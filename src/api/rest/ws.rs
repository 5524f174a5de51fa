use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::event::DispatchEvent;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    pub order_id: Option<Uuid>,
}

/// `GET /ws` subscribes to the global feed; `GET /ws?order_id=...`
/// narrows to a single order's events.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.order_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, order_id: Option<Uuid>) {
    let (mut sender, mut receiver) = socket.split();

    let (snapshot, rx) = match order_id {
        Some(id) => {
            let (snapshot, rx) = state.broadcaster.subscribe_order(id);
            let replay = snapshot.map(|status| DispatchEvent::OrderStatusChanged {
                order_id: id,
                status,
            });
            (replay, rx)
        }
        None => (None, state.broadcaster.subscribe_global()),
    };

    info!(order_id = ?order_id, "websocket client connected");

    let send_task = tokio::spawn(async move {
        if let Some(event) = snapshot {
            if send_event(&mut sender, &event).await.is_err() {
                return;
            }
        }

        let mut stream = BroadcastStream::new(rx);
        while let Some(item) = stream.next().await {
            // Lagged subscribers skip dropped events; no replay offered.
            let Ok(event) = item else { continue };
            if send_event(&mut sender, &event).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!(order_id = ?order_id, "websocket client disconnected");
}

async fn send_event(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    event: &DispatchEvent,
) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(err) => {
            warn!(error = %err, "failed to serialize event for ws");
            return Ok(());
        }
    };

    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}
