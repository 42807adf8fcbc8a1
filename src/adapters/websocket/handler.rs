//! WebSocket upgrade handler for client sessions.
//!
//! Handles the HTTP → WebSocket upgrade and the connection lifecycle:
//! 1. Validate the user id
//! 2. Upgrade and register the connection
//! 3. Forward server messages (task dispatch, status pushes) to the socket
//! 4. Route inbound acknowledgments to the orchestrator
//! 5. On last disconnect, stop the user's driver and tear its state down

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::application::{ExecutionEngine, TaskOrchestrator};
use crate::domain::foundation::{Timestamp, UserId};

use super::connections::{ClientId, ConnectionManager};
use super::messages::{ClientMessage, ConnectedMessage, PongMessage, ServerMessage};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub connections: Arc<ConnectionManager>,
    pub orchestrator: Arc<TaskOrchestrator>,
    pub engine: Arc<ExecutionEngine>,
}

impl WebSocketState {
    pub fn new(
        connections: Arc<ConnectionManager>,
        orchestrator: Arc<TaskOrchestrator>,
        engine: Arc<ExecutionEngine>,
    ) -> Self {
        Self {
            connections,
            orchestrator,
            engine,
        }
    }
}

/// Router for the client session endpoint.
pub fn websocket_router(state: WebSocketState) -> Router {
    Router::new()
        .route("/ws/:user_id", get(ws_handler))
        .with_state(state)
}

/// Handle WebSocket upgrade requests for a user session.
///
/// Route: `GET /ws/:user_id`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    State(state): State<WebSocketState>,
) -> Response {
    let user_id = match UserId::new(user_id) {
        Ok(id) => id,
        Err(_) => {
            return Response::builder()
                .status(400)
                .body("Invalid user id".into())
                .unwrap();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Handle an established WebSocket connection for its lifetime.
async fn handle_socket(socket: WebSocket, user_id: UserId, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();
    let client_id = ClientId::new();

    let mut channel_rx: broadcast::Receiver<ServerMessage> =
        state.connections.join(&user_id, client_id.clone()).await;

    let connected = ServerMessage::Connected(ConnectedMessage {
        user_id: user_id.to_string(),
        client_id: client_id.to_string(),
        timestamp: Timestamp::now().as_datetime().to_rfc3339(),
    });
    if let Err(e) = send_message(&mut sender, &connected).await {
        debug!(client_id = %client_id, "failed to send connected message: {}", e);
        state.connections.leave(&client_id).await;
        return;
    }

    // Forward this user's channel to the socket.
    let mut send_task = {
        let client_id = client_id.clone();
        tokio::spawn(async move {
            while let Ok(message) = channel_rx.recv().await {
                if let Err(e) = send_message(&mut sender, &message).await {
                    debug!(client_id = %client_id, "send error, closing connection: {}", e);
                    break;
                }
            }
        })
    };

    // Route inbound messages.
    let mut recv_task = {
        let state = state.clone();
        let client_id = client_id.clone();
        let path_user = user_id.clone();
        tokio::spawn(async move {
            while let Some(result) = receiver.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        handle_client_message(&state, &path_user, &client_id, &text).await;
                    }
                    Ok(Message::Binary(_)) => {
                        warn!(client_id = %client_id, "unsupported binary message");
                    }
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                        // Protocol-level frames handled by axum.
                    }
                    Ok(Message::Close(_)) => {
                        debug!(client_id = %client_id, "client sent close frame");
                        break;
                    }
                    Err(e) => {
                        debug!(client_id = %client_id, "receive error: {}", e);
                        break;
                    }
                }
            }
        })
    };

    tokio::select! {
        _ = &mut send_task => { recv_task.abort(); }
        _ = &mut recv_task => { send_task.abort(); }
    }

    let last_connection = state.connections.leave(&client_id).await;
    if last_connection {
        debug!(user_id = %user_id, "last connection closed, tearing down user state");
        state.engine.stop(&user_id).await;
        state.orchestrator.cleanup_user(&user_id).await;
    }
}

async fn handle_client_message(
    state: &WebSocketState,
    path_user: &UserId,
    client_id: &ClientId,
    text: &str,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(client_id = %client_id, "undecodable client message: {}", e);
            return;
        }
    };

    match message {
        ClientMessage::TaskResult {
            user_id,
            task_id,
            result,
        } => {
            if &user_id != path_user {
                warn!(
                    client_id = %client_id,
                    claimed = %user_id,
                    connected = %path_user,
                    "ack user id does not match connection, ignoring"
                );
                return;
            }
            state
                .orchestrator
                .handle_client_ack(&user_id, &task_id, result)
                .await;
        }
        ClientMessage::TaskBatchResults { user_id, results } => {
            if &user_id != path_user {
                warn!(
                    client_id = %client_id,
                    claimed = %user_id,
                    connected = %path_user,
                    "batch ack user id does not match connection, ignoring"
                );
                return;
            }
            debug!(user_id = %user_id, count = results.len(), "processing batch results");
            for item in results {
                state
                    .orchestrator
                    .handle_client_ack(&user_id, &item.task_id, item.result)
                    .await;
            }
        }
        ClientMessage::Ping => {
            // Pongs travel through the user's channel; the socket's
            // sender half lives in the forward task.
            let _ = state
                .connections
                .send_to_user(
                    path_user,
                    ServerMessage::Pong(PongMessage {
                        timestamp: Timestamp::now().as_datetime().to_rfc3339(),
                    }),
                )
                .await;
        }
    }
}

async fn send_message(
    sender: &mut (impl futures::Sink<Message, Error = axum::Error> + Unpin),
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).map_err(axum::Error::new)?;
    sender.send(Message::Text(text)).await
}
