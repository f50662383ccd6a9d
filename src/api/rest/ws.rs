use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::Actor;
use crate::notifier::OrderSubscription;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(order_id): Path<Uuid>,
) -> Result<Response, AppError> {
    state.orders.get(order_id, &actor)?;

    let subscription = state.notifier.subscribe(order_id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, subscription)))
}

async fn handle_socket(mut socket: WebSocket, mut subscription: OrderSubscription) {
    let order_id = subscription.order_id();

    info!(order_id = %order_id, "websocket client subscribed");

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        warn!(error = %err, "failed to serialize order event for ws");
                        continue;
                    }
                };

                if socket.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            message = socket.recv() => match message {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    // Unsubscribe before finishing the close handshake.
    drop(subscription);
    let _ = socket.send(Message::Close(None)).await;

    info!(order_id = %order_id, "websocket client unsubscribed");
}
