//! Identity → connection and room → members maps.
//!
//! Plain data with no locking of its own. The event loop is the only writer;
//! out-of-band readers go through the loop's `RwLock`.
//!
//! Invariants kept by every mutating method:
//! - at most one connection per identity
//! - every room member has a live connection, and the connection lists the room
//! - a room with no members is removed

use std::collections::{HashMap, HashSet};

use crate::domain::{ChatId, ConnectionId, UserId};

use super::connection::{Connection, ConnectionState, EnqueueOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    NotConnected,
}

/// Result of fanning one payload out to a room
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: Vec<UserId>,
    pub evicted: Vec<UserId>,
}

#[derive(Debug, Default)]
pub struct Registry {
    connections: HashMap<UserId, Connection>,
    rooms: HashMap<ChatId, HashSet<UserId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection. An existing connection for the same identity is
    /// fully unregistered first, which closes its outbound queue.
    ///
    /// Returns the id of the superseded connection, if any.
    pub fn register(&mut self, mut connection: Connection) -> Option<ConnectionId> {
        let user_id = connection.user_id().clone();
        let superseded = self.connections.get(&user_id).map(Connection::id);
        if let Some(old_id) = superseded {
            self.remove(&user_id, old_id);
        }

        connection.transition(ConnectionState::Registered);
        self.connections.insert(user_id, connection);
        superseded
    }

    /// Remove the connection only if `connection_id` is still the current one
    /// for `user_id`. A late unregister from a superseded socket is a no-op.
    pub fn unregister(&mut self, user_id: &UserId, connection_id: ConnectionId) -> bool {
        self.remove(user_id, connection_id).is_some()
    }

    /// Same removal as `unregister`, used when a queue overflowed
    pub fn evict(&mut self, user_id: &UserId, connection_id: ConnectionId) -> bool {
        self.remove(user_id, connection_id).is_some()
    }

    /// Close whatever connection `user_id` currently holds, regardless of its id.
    ///
    /// Used when the identity itself stops being valid (logout).
    pub fn disconnect(&mut self, user_id: &UserId) -> Option<ConnectionId> {
        let connection_id = self.connection_id(user_id)?;
        self.remove(user_id, connection_id).map(|connection| connection.id())
    }

    /// Idempotent room join for a registered identity
    pub fn join(&mut self, chat_id: ChatId, user_id: &UserId) -> JoinOutcome {
        let Some(connection) = self.connections.get_mut(user_id) else {
            return JoinOutcome::NotConnected;
        };

        let added = connection.add_room(chat_id);
        if connection.state() == ConnectionState::Registered {
            connection.transition(ConnectionState::Active);
        }
        self.rooms
            .entry(chat_id)
            .or_default()
            .insert(user_id.clone());

        if added {
            JoinOutcome::Joined
        } else {
            JoinOutcome::AlreadyMember
        }
    }

    /// Enqueue `payload` for every member of the room except `exclude`.
    ///
    /// Members whose queue is full or closed are evicted before returning.
    /// `None` when the room does not exist.
    pub fn fan_out(
        &mut self,
        chat_id: ChatId,
        payload: &str,
        exclude: Option<&UserId>,
    ) -> Option<FanOut> {
        let members = self.rooms.get(&chat_id)?;

        let mut result = FanOut::default();
        let mut overflowed = Vec::new();
        for member in members {
            if exclude == Some(member) {
                continue;
            }
            let Some(connection) = self.connections.get(member) else {
                continue;
            };
            match connection.try_enqueue(payload) {
                EnqueueOutcome::Queued => result.delivered.push(member.clone()),
                EnqueueOutcome::Full | EnqueueOutcome::Closed => {
                    overflowed.push((member.clone(), connection.id()));
                }
            }
        }

        for (member, connection_id) in overflowed {
            self.remove(&member, connection_id);
            result.evicted.push(member);
        }

        Some(result)
    }

    /// Non-mutating delivery to one identity. The caller decides what to do
    /// with a `Full` / `Closed` outcome.
    pub fn deliver_to(
        &self,
        user_id: &UserId,
        payload: &str,
    ) -> Option<(ConnectionId, EnqueueOutcome)> {
        let connection = self.connections.get(user_id)?;
        Some((connection.id(), connection.try_enqueue(payload)))
    }

    pub fn is_connected(&self, user_id: &UserId) -> bool {
        self.connections.contains_key(user_id)
    }

    pub fn connection_id(&self, user_id: &UserId) -> Option<ConnectionId> {
        self.connections.get(user_id).map(Connection::id)
    }

    /// Sorted live members of a room
    pub fn room_members(&self, chat_id: ChatId) -> Option<Vec<UserId>> {
        let mut members: Vec<UserId> = self.rooms.get(&chat_id)?.iter().cloned().collect();
        members.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Some(members)
    }

    pub fn rooms_of(&self, user_id: &UserId) -> Option<Vec<ChatId>> {
        let connection = self.connections.get(user_id)?;
        let mut rooms: Vec<ChatId> = connection.rooms().iter().copied().collect();
        rooms.sort_by_key(ChatId::value);
        Some(rooms)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Drop every connection, closing all outbound queues
    pub fn close_all(&mut self) -> usize {
        let count = self.connections.len();
        for (_, mut connection) in self.connections.drain() {
            connection.transition(ConnectionState::Closed);
        }
        self.rooms.clear();
        count
    }

    fn remove(&mut self, user_id: &UserId, connection_id: ConnectionId) -> Option<Connection> {
        match self.connections.get(user_id) {
            Some(current) if current.id() == connection_id => {}
            _ => return None,
        }

        let mut connection = self.connections.remove(user_id)?;
        connection.transition(ConnectionState::Unregistering);
        for chat_id in connection.take_rooms() {
            if let Some(members) = self.rooms.get_mut(&chat_id) {
                members.remove(user_id);
                if members.is_empty() {
                    self.rooms.remove(&chat_id);
                }
            }
        }
        connection.transition(ConnectionState::Closed);
        tracing::debug!("removed connection {} for {}", connection_id, user_id);

        // Dropping the connection drops the only sender of its outbound queue.
        Some(connection)
    }
}
