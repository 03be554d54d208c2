//! Wire protocol and WebSocket transports.
//!
//! Messages are JSON text frames tagged by `"type"`:
//! ```json
//! { "type": "join", "room": "room-id", "display_name": "ada" }
//! { "type": "draw_action", "room": "room-id", "action": { "type": "add", "element": { ... } } }
//! { "type": "request_state", "room": "room-id" }
//! ```

use crate::element::{Element, ElementId};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A committed edit, as exchanged between peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrawAction {
    /// A new element.
    Add { element: Element },
    /// Replacement for an existing element with the same id.
    Update { element: Element },
    /// Removal of an element.
    Delete { element_id: ElementId },
    /// The complete element list.
    Batch { elements: Vec<Element> },
}

impl DrawAction {
    /// Apply this action to an element list. Returns whether anything changed.
    ///
    /// `add` of an id that is already present replaces it, so duplicate
    /// delivery is harmless. `update` and `delete` of unknown ids are ignored.
    pub fn apply_to(&self, elements: &mut Vec<Element>) -> bool {
        match self {
            DrawAction::Add { element } => {
                match elements.iter_mut().find(|e| e.id == element.id) {
                    Some(existing) if existing == element => false,
                    Some(existing) => {
                        *existing = element.clone();
                        true
                    }
                    None => {
                        elements.push(element.clone());
                        true
                    }
                }
            }
            DrawAction::Update { element } => {
                match elements.iter_mut().find(|e| e.id == element.id) {
                    Some(existing) if existing == element => false,
                    Some(existing) => {
                        *existing = element.clone();
                        true
                    }
                    None => false,
                }
            }
            DrawAction::Delete { element_id } => {
                let before = elements.len();
                elements.retain(|e| e.id != *element_id);
                elements.len() != before
            }
            DrawAction::Batch { elements: batch } => {
                if *elements == *batch {
                    false
                } else {
                    *elements = batch.clone();
                    true
                }
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DrawAction::Add { .. } => "add",
            DrawAction::Update { .. } => "update",
            DrawAction::Delete { .. } => "delete",
            DrawAction::Batch { .. } => "batch",
        }
    }
}

/// Messages sent to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a room under a display name
    Join { room: String, display_name: String },
    /// Leave current room
    Leave,
    /// Publish a committed edit to the room
    DrawAction { room: String, action: DrawAction },
    /// Ask for the room's full element list
    RequestState { room: String },
}

/// Messages received from the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm room join with the current members
    Joined { room: String, users: Vec<String> },
    /// Full element list of the room
    InitialState { elements: Vec<Element> },
    /// Edit made by another member
    DrawAction { action: DrawAction },
    /// Membership changed
    Presence { users: Vec<String> },
    /// Error message
    Error { message: String },
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from a transport
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Connected to server
    Connected,
    /// Disconnected from server
    Disconnected,
    /// Joined a room
    Joined { room: String, users: Vec<String> },
    /// Received the room's element list
    InitialState { elements: Vec<Element> },
    /// Received an edit from another member
    RemoteAction { action: DrawAction },
    /// Room membership changed
    Presence { users: Vec<String> },
    /// The server rejected a message
    ServerError { message: String },
    /// Transport failure
    Error { message: String },
}

impl From<ServerMessage> for SyncEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::Joined { room, users } => SyncEvent::Joined { room, users },
            ServerMessage::InitialState { elements } => SyncEvent::InitialState { elements },
            ServerMessage::DrawAction { action } => SyncEvent::RemoteAction { action },
            ServerMessage::Presence { users } => SyncEvent::Presence { users },
            ServerMessage::Error { message } => SyncEvent::ServerError { message },
        }
    }
}

/// A bidirectional text-message channel to the room server.
///
/// Delivery is polled: incoming traffic is buffered until `poll_events`.
pub trait Transport {
    /// Start connecting. Completion is reported as [`SyncEvent::Connected`].
    fn connect(&mut self, url: &str) -> Result<()>;

    /// Close the connection and drop any pending events.
    fn disconnect(&mut self);

    /// Queue a text frame.
    fn send(&mut self, msg: &str) -> Result<()>;

    /// Take pending events (non-blocking).
    fn poll_events(&mut self) -> Vec<SyncEvent>;

    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

fn track_state(state: &mut ConnectionState, event: &SyncEvent) {
    match event {
        SyncEvent::Connected => *state = ConnectionState::Connected,
        SyncEvent::Disconnected => *state = ConnectionState::Disconnected,
        SyncEvent::Error { .. } => *state = ConnectionState::Error,
        _ => {}
    }
}

// ============================================================================
// Native WebSocket Client
// ============================================================================

mod native_client {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};
    use url::Url;

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// WebSocket client for native platforms.
    ///
    /// Uses a background thread for non-blocking operation.
    pub struct NativeWebSocket {
        state: ConnectionState,
        events: Vec<SyncEvent>,
        /// Channel to send commands to the WebSocket thread.
        cmd_tx: Option<Sender<WsCommand>>,
        /// Channel to receive events from the WebSocket thread.
        event_rx: Option<Receiver<SyncEvent>>,
        /// Handle to the WebSocket thread.
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeWebSocket {
        /// Create a new disconnected WebSocket client.
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }
    }

    /// Check that `url` is a ws:// or wss:// URL.
    pub fn validate_ws_url(url: &str) -> Result<Url> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        match parsed.scheme() {
            "ws" | "wss" => Ok(parsed),
            other => Err(Error::InvalidUrl(format!("unsupported scheme: {other}"))),
        }
    }

    fn run_socket(url: String, cmd_rx: Receiver<WsCommand>, event_tx: Sender<SyncEvent>) {
        log::info!("WebSocket thread: connecting to {}", url);

        let (mut socket, response) = match connect(url.as_str()) {
            Ok(pair) => pair,
            Err(e) => {
                log::error!("WebSocket connection failed: {}", e);
                let _ = event_tx.send(SyncEvent::Error {
                    message: format!("Connection failed: {e}"),
                });
                return;
            }
        };

        log::info!("WebSocket connected, status: {}", response.status());
        let _ = event_tx.send(SyncEvent::Connected);

        // Short read timeout so the loop can service outgoing commands.
        if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }

        loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(msg)) => {
                    log::debug!("WebSocket sending {} bytes", msg.len());
                    if let Err(e) = socket.send(Message::Text(msg)) {
                        log::error!("WebSocket send error: {}", e);
                        break;
                    }
                }
                Ok(WsCommand::Close) => {
                    log::info!("WebSocket close requested");
                    let _ = socket.close(None);
                    break;
                }
                Err(TryRecvError::Disconnected) => {
                    log::info!("WebSocket command channel disconnected");
                    break;
                }
                Err(TryRecvError::Empty) => {}
            }

            match socket.read() {
                Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                    Ok(server_msg) => {
                        let _ = event_tx.send(server_msg.into());
                    }
                    Err(e) => log::warn!("Failed to parse server message: {}", e),
                },
                Ok(Message::Ping(data)) => {
                    let _ = socket.send(Message::Pong(data));
                }
                Ok(Message::Close(_)) => {
                    log::info!("WebSocket received close frame");
                    break;
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => {
                    log::error!("WebSocket read error: {}", e);
                    break;
                }
            }
        }

        log::info!("WebSocket thread exiting");
        let _ = event_tx.send(SyncEvent::Disconnected);
    }

    impl Transport for NativeWebSocket {
        fn connect(&mut self, url: &str) -> Result<()> {
            if self.cmd_tx.is_some() {
                return Err(Error::AlreadyConnected);
            }
            validate_ws_url(url)?;

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<SyncEvent>();
            let url = url.to_string();
            let handle = thread::spawn(move || run_socket(url, cmd_rx, event_tx));

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.events.clear();
            self.state = ConnectionState::Disconnected;
        }

        fn send(&mut self, msg: &str) -> Result<()> {
            match self.cmd_tx {
                Some(ref tx) => tx
                    .send(WsCommand::Send(msg.to_string()))
                    .map_err(|e| Error::Connection(format!("Send failed: {e}"))),
                None => Err(Error::NotConnected),
            }
        }

        fn poll_events(&mut self) -> Vec<SyncEvent> {
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    track_state(&mut self.state, &event);
                    self.events.push(event);
                }
            }
            // The socket thread is gone once it reports an end state.
            if matches!(self.state, ConnectionState::Disconnected | ConnectionState::Error) {
                self.cmd_tx = None;
                self.event_rx = None;
                self._thread = None;
            }
            std::mem::take(&mut self.events)
        }

        fn state(&self) -> ConnectionState {
            self.state
        }
    }

    impl Default for NativeWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeWebSocket {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}

pub use native_client::{NativeWebSocket, validate_ws_url};

// ============================================================================
// In-process transport
// ============================================================================

/// A transport with no network behind it.
///
/// Outgoing frames are collected for inspection and incoming traffic is
/// injected by the owner. Used for headless peers and for driving a
/// [`crate::collaboration::SyncClient`] without a server.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: ConnectionState,
    inbox: VecDeque<SyncEvent>,
    outbox: Vec<String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for the next `poll_events`.
    pub fn push_event(&mut self, event: SyncEvent) {
        self.inbox.push_back(event);
    }

    /// Queue a server message for the next `poll_events`.
    pub fn push_server_message(&mut self, msg: ServerMessage) {
        self.push_event(msg.into());
    }

    /// Take every frame sent since the last call.
    pub fn take_sent(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbox)
    }

    /// Take and decode every frame sent since the last call.
    pub fn take_sent_messages(&mut self) -> Result<Vec<ClientMessage>> {
        self.take_sent()
            .iter()
            .map(|s| serde_json::from_str(s).map_err(Error::from))
            .collect()
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self, url: &str) -> Result<()> {
        if self.state == ConnectionState::Connected || self.state == ConnectionState::Connecting {
            return Err(Error::AlreadyConnected);
        }
        validate_ws_url(url)?;
        self.state = ConnectionState::Connecting;
        self.inbox.push_back(SyncEvent::Connected);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.inbox.clear();
        self.state = ConnectionState::Disconnected;
    }

    fn send(&mut self, msg: &str) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }
        self.outbox.push(msg.to_string());
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<SyncEvent> {
        let events: Vec<SyncEvent> = self.inbox.drain(..).collect();
        for event in &events {
            track_state(&mut self.state, event);
        }
        events
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}
