//! Connection registry and derived presence.
//!
//! Tracks every live websocket connection per user. A user is online iff at
//! least one of their connections is registered; the 0→1 and 1→0 transitions
//! are what drive `user_online` broadcasts. The registry is an owned value
//! injected through AppState so tests can run independent instances.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use crate::ws::protocol::ServerEvent;

/// Sender half of a connection's outbound channel. Other parts of the
/// system clone this to push events to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Opaque identifier for one live transport connection. Allocated by the
/// registry when the connection's actor starts, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Result of removing a connection from its user's set.
#[derive(Debug)]
pub struct Disconnect {
    pub user_id: String,
    /// True iff this removal emptied the user's connection set.
    pub went_offline: bool,
}

/// Result of binding a connection to a user identity.
#[derive(Debug, Default)]
pub struct RegisterOutcome {
    /// True iff this registration flipped the user from zero connections to
    /// one. The caller broadcasts `user_online` exactly when this is set.
    pub came_online: bool,
    /// Present when the handle was previously bound to a different identity;
    /// re-registration re-associates instead of duplicating.
    pub displaced: Option<Disconnect>,
}

pub struct ConnectionRegistry {
    next_id: AtomicU64,
    /// userId → set of live connections. Entries are created lazily on first
    /// registration and removed when the set empties — no tombstones.
    users: DashMap<String, HashMap<ConnectionId, ConnectionSender>>,
    /// Reverse index so unregister only needs the handle.
    owners: DashMap<ConnectionId, String>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            users: DashMap::new(),
            owners: DashMap::new(),
        }
    }

    /// Allocate a fresh handle for a new transport connection.
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Bind a connection to a user. The emptiness check and the insert run
    /// under one map-entry lock, so two racing registrations for the same
    /// user produce exactly one `came_online`.
    pub fn register(
        &self,
        conn: ConnectionId,
        user_id: &str,
        sender: ConnectionSender,
    ) -> RegisterOutcome {
        let displaced = match self.owners.insert(conn, user_id.to_string()) {
            Some(previous) if previous != user_id => self.detach(conn, &previous),
            _ => None,
        };

        let came_online = {
            let mut entry = self.users.entry(user_id.to_string()).or_default();
            let was_empty = entry.is_empty();
            entry.insert(conn, sender);
            was_empty
        };

        RegisterOutcome {
            came_online,
            displaced,
        }
    }

    /// Remove a connection on disconnect. Unknown handles are a no-op.
    pub fn unregister(&self, conn: ConnectionId) -> Option<Disconnect> {
        let (_, user_id) = self.owners.remove(&conn)?;
        self.detach(conn, &user_id)
    }

    /// Point-in-time presence query, no side effects.
    pub fn is_online(&self, user_id: &str) -> bool {
        self.users
            .get(user_id)
            .map(|conns| !conns.is_empty())
            .unwrap_or(false)
    }

    /// Deliver an event to every live connection of one user — the user's
    /// personal channel. Fire-and-forget: no connections means no delivery,
    /// not an error.
    pub fn send_to_user(&self, user_id: &str, event: &ServerEvent) {
        let Some(msg) = event.to_message() else { return };
        if let Some(conns) = self.users.get(user_id) {
            for sender in conns.values() {
                let _ = sender.send(msg.clone());
            }
        }
    }

    /// Deliver an event to every connected client. Presence flips are global
    /// by product decision; a slow recipient only backs up its own channel.
    pub fn broadcast_all(&self, event: &ServerEvent) {
        let Some(msg) = event.to_message() else { return };
        for entry in self.users.iter() {
            for sender in entry.value().values() {
                let _ = sender.send(msg.clone());
            }
        }
    }

    /// Remove `conn` from `user_id`'s set. Reports whether that emptied the
    /// set; the entry itself is only dropped if still empty at that moment,
    /// so a racing register keeps its freshly-added connection.
    fn detach(&self, conn: ConnectionId, user_id: &str) -> Option<Disconnect> {
        let removed = match self.users.get_mut(user_id) {
            Some(mut conns) => conns.remove(&conn).is_some(),
            None => false,
        };
        if !removed {
            return None;
        }
        let went_offline = self
            .users
            .remove_if(user_id, |_, conns| conns.is_empty())
            .is_some();
        Some(Disconnect {
            user_id: user_id.to_string(),
            went_offline,
        })
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
