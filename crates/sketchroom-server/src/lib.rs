//! SketchRoom WebSocket Room Server
//!
//! Holds the authoritative element list of every room, applies each
//! member's edits to it and relays them to the other members.
//!
//! ## Protocol
//!
//! JSON text frames tagged by `"type"`, see [`sketchroom_core::sync`]:
//! ```json
//! { "type": "join", "room": "room-id", "display_name": "ada" }
//! { "type": "draw_action", "room": "room-id", "action": { "type": "delete", "element_id": { ... } } }
//! { "type": "request_state", "room": "room-id" }
//! ```

pub mod config;
pub mod error;
pub mod room;

pub use config::ServerConfig;
pub use error::{Result, RoomError, ServerError};
pub use room::{Broadcast, ConnectionId, JoinTicket, RoomCoordinator};

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use sketchroom_core::{ClientMessage, ServerMessage};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Build the HTTP router around a shared coordinator.
pub fn router(coordinator: Arc<RoomCoordinator>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}

/// Bind the configured address and serve until the process stops.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.addr()).await?;
    let coordinator = Arc::new(RoomCoordinator::new(config.channel_capacity));
    serve_on(listener, coordinator).await
}

/// Serve on an already bound listener.
pub async fn serve_on(listener: TcpListener, coordinator: Arc<RoomCoordinator>) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("SketchRoom server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);
    axum::serve(listener, router(coordinator)).await?;
    Ok(())
}

/// Index page
async fn index() -> &'static str {
    "SketchRoom Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(coordinator): State<Arc<RoomCoordinator>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, coordinator))
}

/// Room membership of one socket.
struct Connection {
    id: ConnectionId,
    coordinator: Arc<RoomCoordinator>,
    room: Option<String>,
    receiver: Option<broadcast::Receiver<Broadcast>>,
}

impl Connection {
    fn new(coordinator: Arc<RoomCoordinator>) -> Self {
        Self {
            id: Uuid::new_v4(),
            coordinator,
            room: None,
            receiver: None,
        }
    }

    /// Handle one client message and return the direct replies.
    fn handle(&mut self, msg: ClientMessage) -> Vec<ServerMessage> {
        match msg {
            ClientMessage::Join { room, display_name } => {
                self.leave_room();
                let ticket = self.coordinator.join(&room, self.id, &display_name);
                info!("Connection {} joined room {} as {}", self.id, room, display_name);
                self.receiver = Some(ticket.receiver);
                self.room = Some(room.clone());
                vec![
                    ServerMessage::Joined { room, users: ticket.users },
                    ServerMessage::InitialState { elements: ticket.elements },
                ]
            }
            ClientMessage::Leave => {
                self.leave_room();
                Vec::new()
            }
            ClientMessage::DrawAction { room, action } => {
                debug!("Connection {} sent {} to room {}", self.id, action.kind(), room);
                match self.coordinator.apply(&room, self.id, action) {
                    Ok(_) => Vec::new(),
                    Err(e) => vec![error_message(&e)],
                }
            }
            ClientMessage::RequestState { room } => match self.coordinator.snapshot(&room, self.id) {
                Ok(elements) => vec![ServerMessage::InitialState { elements }],
                Err(e) => vec![error_message(&e)],
            },
        }
    }

    fn leave_room(&mut self) {
        if let Some(room) = self.room.take() {
            self.coordinator.leave(&room, self.id);
            info!("Connection {} left room {}", self.id, room);
        }
        self.receiver = None;
    }
}

fn error_message(e: &impl std::fmt::Display) -> ServerMessage {
    ServerMessage::Error { message: e.to_string() }
}

/// Tells a member it fell behind the room and should ask for its state.
fn lag_notice(skipped: u64) -> ServerMessage {
    ServerMessage::Error {
        message: format!("Missed {} room update(s); send request_state to resync", skipped),
    }
}

/// Next broadcast for this connection, or never if it is in no room.
async fn next_broadcast(
    receiver: &mut Option<broadcast::Receiver<Broadcast>>,
) -> std::result::Result<Broadcast, RecvError> {
    match receiver {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Send messages in order. Returns false once the socket is gone.
async fn send_all(sender: &mut SplitSink<WebSocket, Message>, messages: &[ServerMessage]) -> bool {
    for msg in messages {
        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode outgoing message: {}", e);
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            return false;
        }
    }
    true
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, coordinator: Arc<RoomCoordinator>) {
    let mut conn = Connection::new(coordinator);
    info!("New connection: {}", conn.id);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let replies = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => conn.handle(client_msg),
                            Err(e) => {
                                warn!("Invalid message from {}: {}", conn.id, e);
                                vec![ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                }]
                            }
                        };
                        if !send_all(&mut sender, &replies).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {} // Ignore binary and ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", conn.id, e);
                        break;
                    }
                }
            }

            // Handle broadcast messages from the room
            event = next_broadcast(&mut conn.receiver) => {
                match event {
                    Ok(b) if b.is_for(conn.id) => {
                        if !send_all(&mut sender, std::slice::from_ref(&b.message)).await {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Connection {} lagged, skipped {} messages", conn.id, skipped);
                        if !send_all(&mut sender, &[lag_notice(skipped)]).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => {
                        conn.receiver = None;
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    conn.leave_room();
    info!("Connection closed: {}", conn.id);
}
