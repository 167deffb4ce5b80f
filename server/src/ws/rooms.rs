//! Pair-room routing.
//!
//! A pair room is the routing group for exactly two user identities. The
//! room key is derived — sorted identities joined with a separator — so any
//! two users can always be routed together without a conversation-creation
//! step, and both participants land in the same room regardless of who
//! initiates.

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};

use crate::ws::protocol::ServerEvent;
use crate::ws::registry::{ConnectionId, ConnectionSender};

const ROOM_SEPARATOR: char = ':';

/// Canonical room key for an unordered pair of user identities.
/// room_id_for(a, b) == room_id_for(b, a) for all a, b.
pub fn room_id_for(user_a: &str, user_b: &str) -> String {
    if user_a <= user_b {
        format!("{user_a}{ROOM_SEPARATOR}{user_b}")
    } else {
        format!("{user_b}{ROOM_SEPARATOR}{user_a}")
    }
}

/// Membership maps for all live pair rooms. Like the connection registry,
/// an owned value injected through AppState.
pub struct PairRooms {
    /// room key → connections currently joined.
    rooms: DashMap<String, HashMap<ConnectionId, ConnectionSender>>,
    /// connection → rooms it joined, for disconnect cleanup. Membership is
    /// additive: one connection may sit in several pair rooms at once.
    joined: DashMap<ConnectionId, HashSet<String>>,
}

impl PairRooms {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            joined: DashMap::new(),
        }
    }

    /// Join the room for this pair. Joining twice has no additional effect.
    pub fn join(
        &self,
        conn: ConnectionId,
        sender: ConnectionSender,
        user_id: &str,
        friend_id: &str,
    ) {
        let room = room_id_for(user_id, friend_id);
        self.rooms.entry(room.clone()).or_default().insert(conn, sender);
        self.joined.entry(conn).or_default().insert(room);
    }

    /// Deliver an event to every connection joined to the pair's room.
    pub fn broadcast(&self, user_id: &str, friend_id: &str, event: &ServerEvent) {
        self.broadcast_inner(user_id, friend_id, None, event);
    }

    /// Deliver an event to the pair's room, skipping the originating
    /// connection (typing relays echo to everyone but the typist).
    pub fn broadcast_except(
        &self,
        user_id: &str,
        friend_id: &str,
        skip: ConnectionId,
        event: &ServerEvent,
    ) {
        self.broadcast_inner(user_id, friend_id, Some(skip), event);
    }

    fn broadcast_inner(
        &self,
        user_id: &str,
        friend_id: &str,
        skip: Option<ConnectionId>,
        event: &ServerEvent,
    ) {
        let Some(msg) = event.to_message() else { return };
        let room = room_id_for(user_id, friend_id);
        if let Some(members) = self.rooms.get(&room) {
            for (conn, sender) in members.iter() {
                if skip == Some(*conn) {
                    continue;
                }
                let _ = sender.send(msg.clone());
            }
        }
    }

    /// Drop a connection from every room it joined. Called on disconnect.
    pub fn leave_all(&self, conn: ConnectionId) {
        let Some((_, rooms)) = self.joined.remove(&conn) else {
            return;
        };
        for room in rooms {
            if let Some(mut members) = self.rooms.get_mut(&room) {
                members.remove(&conn);
            }
            self.rooms.remove_if(&room, |_, members| members.is_empty());
        }
    }
}

impl Default for PairRooms {
    fn default() -> Self {
        Self::new()
    }
}
