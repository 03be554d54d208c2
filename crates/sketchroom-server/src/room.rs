//! Authoritative per-room state.
//!
//! Every mutation of a room and the broadcast describing it happen while
//! that room's map entry is held, so members see broadcasts in the same
//! order the mutations were applied.

use crate::error::RoomError;
use dashmap::DashMap;
use sketchroom_core::{DrawAction, Element, ServerMessage};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Identifies one WebSocket connection.
pub type ConnectionId = Uuid;

/// A message published to a room.
#[derive(Debug, Clone)]
pub struct Broadcast {
    /// Connection that must not receive it, usually the author.
    pub exclude: Option<ConnectionId>,
    pub message: ServerMessage,
}

impl Broadcast {
    pub fn is_for(&self, connection: ConnectionId) -> bool {
        self.exclude != Some(connection)
    }
}

struct Room {
    tx: broadcast::Sender<Broadcast>,
    elements: Vec<Element>,
    members: HashMap<ConnectionId, String>,
    /// Join order, for stable presence lists.
    order: Vec<ConnectionId>,
}

impl Room {
    fn new(channel_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(channel_capacity);
        Self {
            tx,
            elements: Vec::new(),
            members: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn users(&self) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|id| self.members.get(id).cloned())
            .collect()
    }

    fn publish(&self, exclude: Option<ConnectionId>, message: ServerMessage) {
        // No receivers just means nobody is listening.
        let _ = self.tx.send(Broadcast { exclude, message });
    }

    fn publish_presence(&self) {
        self.publish(None, ServerMessage::Presence { users: self.users() });
    }
}

/// What a connection receives on joining.
#[derive(Debug)]
pub struct JoinTicket {
    pub receiver: broadcast::Receiver<Broadcast>,
    pub users: Vec<String>,
    pub elements: Vec<Element>,
}

/// Shared state for all rooms.
pub struct RoomCoordinator {
    rooms: DashMap<String, Room>,
    channel_capacity: usize,
}

impl RoomCoordinator {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Add a connection to a room, creating the room if needed.
    ///
    /// The returned receiver is subscribed before the presence broadcast,
    /// so the joiner sees its own arrival.
    pub fn join(&self, room: &str, connection: ConnectionId, display_name: &str) -> JoinTicket {
        let mut entry = self
            .rooms
            .entry(room.to_string())
            .or_insert_with(|| Room::new(self.channel_capacity));
        let receiver = entry.tx.subscribe();
        if entry.members.insert(connection, display_name.to_string()).is_none() {
            entry.order.push(connection);
        }
        entry.publish_presence();
        JoinTicket {
            receiver,
            users: entry.users(),
            elements: entry.elements.clone(),
        }
    }

    /// Remove a connection from a room. Empty rooms are dropped.
    pub fn leave(&self, room: &str, connection: ConnectionId) -> bool {
        let removed = match self.rooms.get_mut(room) {
            Some(mut entry) => {
                let removed = entry.members.remove(&connection).is_some();
                if removed {
                    entry.order.retain(|id| *id != connection);
                    entry.publish_presence();
                }
                removed
            }
            None => false,
        };
        if self.rooms.remove_if(room, |_, r| r.members.is_empty()).is_some() {
            debug!("Room {} is empty, dropped", room);
        }
        removed
    }

    /// Apply a member's action and relay it to the other members.
    ///
    /// The action is relayed even when it changed nothing here, for
    /// example an update of an id this room has never seen.
    pub fn apply(&self, room: &str, connection: ConnectionId, action: DrawAction) -> Result<bool, RoomError> {
        let mut entry = self.member_entry(room, connection)?;
        let changed = action.apply_to(&mut entry.elements);
        entry.publish(Some(connection), ServerMessage::DrawAction { action });
        Ok(changed)
    }

    /// The room's element list, for one of its members.
    pub fn snapshot(&self, room: &str, connection: ConnectionId) -> Result<Vec<Element>, RoomError> {
        let entry = self.member_entry(room, connection)?;
        Ok(entry.elements.clone())
    }

    pub fn presence(&self, room: &str) -> Vec<String> {
        self.rooms.get(room).map(|r| r.users()).unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains_room(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }

    fn member_entry(
        &self,
        room: &str,
        connection: ConnectionId,
    ) -> Result<dashmap::mapref::one::RefMut<'_, String, Room>, RoomError> {
        self.rooms
            .get_mut(room)
            .filter(|r| r.members.contains_key(&connection))
            .ok_or_else(|| RoomError::NotMember(room.to_string()))
    }
}
