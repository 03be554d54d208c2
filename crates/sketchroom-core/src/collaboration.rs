//! Room synchronization client.
//!
//! Bridges the local [`ElementStore`] and a room on the server: announces
//! the user, forwards committed edits, merges edits from other members and
//! tracks presence.

use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::ElementStore;
use crate::sync::{ClientMessage, ConnectionState, DrawAction, NativeWebSocket, SyncEvent, Transport};

/// Endpoint used when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:3001/ws";
/// Environment variable overriding the endpoint.
pub const SERVER_URL_ENV: &str = "SKETCHROOM_SERVER_URL";
/// Query parameter carrying the room id in a share link.
pub const ROOM_QUERY_PARAM: &str = "room";

/// Where to connect and who to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub server_url: String,
    pub room: String,
    pub display_name: String,
}

impl SyncConfig {
    pub fn new(room: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            room: room.into(),
            display_name: display_name.into(),
        }
    }

    /// Like [`SyncConfig::new`], taking the endpoint from `SKETCHROOM_SERVER_URL` if set.
    pub fn from_env(room: impl Into<String>, display_name: impl Into<String>) -> Self {
        let config = Self::new(room, display_name);
        match std::env::var(SERVER_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => config.with_server_url(url.trim()),
            _ => config,
        }
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }
}

/// A short random room id.
pub fn generate_room_id() -> String {
    Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

/// The room id carried in a share link, if any.
pub fn room_from_url(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == ROOM_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|room| !room.is_empty())
}

/// `base` with its room parameter set to `room`.
pub fn share_url(base: &str, room: &str) -> Result<String> {
    let mut url = Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{base}: {e}")))?;
    let others: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != ROOM_QUERY_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(others)
        .append_pair(ROOM_QUERY_PARAM, room);
    Ok(url.into())
}

/// Client side of the room protocol.
pub struct SyncClient<T: Transport = NativeWebSocket> {
    transport: T,
    config: SyncConfig,
    joined: bool,
    /// Number of successful joins; anything after the first is a rejoin.
    joins: u32,
    users: Vec<String>,
}

impl<T: Transport> SyncClient<T> {
    pub fn new(transport: T, config: SyncConfig) -> Self {
        Self {
            transport,
            config,
            joined: false,
            joins: 0,
            users: Vec::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn room(&self) -> &str {
        &self.config.room
    }

    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Whether the server has confirmed membership of the room.
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Display names currently in the room.
    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Open the connection. The join is sent once it is established.
    pub fn connect(&mut self) -> Result<()> {
        log::info!("Connecting to {} for room {}", self.config.server_url, self.config.room);
        self.transport.connect(&self.config.server_url)
    }

    /// Leave the room and close the connection.
    pub fn disconnect(&mut self) {
        if self.joined {
            if let Err(e) = self.send(&ClientMessage::Leave) {
                log::debug!("Leave not delivered: {}", e);
            }
        }
        self.transport.disconnect();
        self.reset_membership();
    }

    /// Move to another room. Elements of the new room arrive as its initial state.
    pub fn switch_room(&mut self, room: impl Into<String>) -> Result<()> {
        let room = room.into();
        if self.joined {
            self.send(&ClientMessage::Leave)?;
        }
        self.reset_membership();
        self.config.room = room;
        if self.is_connected() {
            self.send_join()?;
        }
        Ok(())
    }

    /// Publish a committed local edit.
    ///
    /// The server relays it to every other member, never back to us.
    pub fn send_action(&mut self, action: DrawAction) -> Result<()> {
        if !self.joined {
            return Err(Error::NotConnected);
        }
        let msg = ClientMessage::DrawAction {
            room: self.config.room.clone(),
            action,
        };
        self.send(&msg)
    }

    /// Ask the server for the room's full element list.
    pub fn request_state(&mut self) -> Result<()> {
        let msg = ClientMessage::RequestState {
            room: self.config.room.clone(),
        };
        self.send(&msg)
    }

    /// Drain transport events, applying room traffic to `store`.
    ///
    /// Remote edits are merged without creating history entries. The
    /// events are returned for the host to observe.
    pub fn poll(&mut self, store: &mut ElementStore) -> Vec<SyncEvent> {
        let events = self.transport.poll_events();
        for event in &events {
            match event {
                SyncEvent::Connected => {
                    log::info!("Connected to {}", self.config.server_url);
                    if let Err(e) = self.send_join() {
                        log::error!("Failed to join room {}: {}", self.config.room, e);
                    }
                }
                SyncEvent::Joined { room, users } => {
                    if room != &self.config.room {
                        log::warn!("Joined unexpected room {}", room);
                        continue;
                    }
                    self.joined = true;
                    self.joins += 1;
                    self.users = users.clone();
                    log::info!("Joined room {} with {} user(s)", room, users.len());
                    if self.joins > 1 {
                        if let Err(e) = self.request_state() {
                            log::warn!("Resync request failed: {}", e);
                        }
                    }
                }
                SyncEvent::InitialState { elements } => {
                    log::debug!("Received room state with {} element(s)", elements.len());
                    store.apply_remote(&DrawAction::Batch {
                        elements: elements.clone(),
                    });
                }
                SyncEvent::RemoteAction { action } => {
                    if !store.apply_remote(action) {
                        log::debug!("Remote {} action changed nothing", action.kind());
                    }
                }
                SyncEvent::Presence { users } => {
                    self.users = users.clone();
                }
                SyncEvent::ServerError { message } => {
                    log::warn!("Server rejected message: {}", message);
                }
                SyncEvent::Disconnected => {
                    log::info!("Disconnected from {}", self.config.server_url);
                    self.reset_membership();
                }
                SyncEvent::Error { message } => {
                    log::error!("Sync transport error: {}", message);
                    self.reset_membership();
                }
            }
        }
        events
    }

    fn send_join(&mut self) -> Result<()> {
        let msg = ClientMessage::Join {
            room: self.config.room.clone(),
            display_name: self.config.display_name.clone(),
        };
        self.send(&msg)
    }

    fn send(&mut self, msg: &ClientMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.transport.send(&json)
    }

    fn reset_membership(&mut self) {
        self.joined = false;
        self.users.clear();
    }
}
