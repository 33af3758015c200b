//! Local room membership for sockets connected to this node

use crate::socket::Socket;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Members = HashMap<String, Arc<dyn Socket>>;

/// Local room membership
///
/// Maps room name to the sockets connected to this node that joined it. A room
/// exists only while it has members; the last leave removes its entry.
#[derive(Default, Clone)]
pub struct RoomRegistry {
    // room -> socket id -> socket
    inner: Arc<RwLock<HashMap<String, Members>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a socket to a room, creating the room if needed
    ///
    /// Joining twice with the same socket id keeps a single membership.
    pub async fn join(&self, room: &str, socket: Arc<dyn Socket>) {
        let mut guard = self.inner.write().await;
        let members = guard.entry(room.to_string()).or_default();
        members.insert(socket.id().to_string(), socket);

        tracing::debug!(room = %room, members = members.len(), "Socket joined room");
    }

    /// Remove a socket from a room
    ///
    /// No-op when the room or socket is absent. Drops the room once empty.
    pub async fn leave(&self, room: &str, socket_id: &str) {
        let mut guard = self.inner.write().await;

        if let Some(members) = guard.get_mut(room) {
            if members.remove(socket_id).is_some() {
                tracing::debug!(
                    room = %room,
                    socket_id = %socket_id,
                    remaining = members.len(),
                    "Socket left room"
                );
            }

            if members.is_empty() {
                guard.remove(room);
                tracing::debug!(room = %room, "Removed empty room from registry");
            }
        }
    }

    /// Remove a socket from every room it joined; returns those rooms
    ///
    /// Must be called when a connection closes.
    pub async fn leave_all(&self, socket_id: &str) -> Vec<String> {
        let mut guard = self.inner.write().await;
        let mut left = Vec::new();

        guard.retain(|room, members| {
            if members.remove(socket_id).is_some() {
                left.push(room.clone());
            }
            !members.is_empty()
        });

        if !left.is_empty() {
            tracing::debug!(socket_id = %socket_id, rooms = left.len(), "Socket left all rooms");
        }

        left
    }

    /// Snapshot of the sockets in a room (empty if the room does not exist)
    pub async fn members_of(&self, room: &str) -> Vec<Arc<dyn Socket>> {
        let guard = self.inner.read().await;
        guard
            .get(room)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn member_count(&self, room: &str) -> usize {
        let guard = self.inner.read().await;
        guard.get(room).map(|m| m.len()).unwrap_or(0)
    }

    pub async fn rooms(&self) -> Vec<String> {
        let guard = self.inner.read().await;
        guard.keys().cloned().collect()
    }

    pub async fn room_count(&self) -> usize {
        self.inner.read().await.len()
    }
}
