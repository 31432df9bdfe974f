//! A live connection as owned by the registry.

use std::collections::HashSet;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::{ChatId, ConnectionId, Timestamp, UserId};

/// Default bound of a connection's outbound queue
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Producer side of a connection's outbound queue (serialized envelopes).
pub type Outbox = mpsc::Sender<String>;

/// Lifecycle of one connection.
///
/// `Connecting → Authenticated → Registered → Active → Unregistering → Closed`,
/// with `Closed` reachable from any state. There is no reconnect state; a
/// dropped client authenticates again from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Authenticated,
    Registered,
    Active,
    Unregistering,
    Closed,
}

impl ConnectionState {
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Connecting, Authenticated)
                | (Authenticated, Registered)
                | (Registered, Active)
                | (Active, Active)
                | (Registered | Active, Unregistering)
                | (_, Closed)
        )
    }
}

/// Result of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    Full,
    Closed,
}

#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    outbox: Outbox,
    rooms: HashSet<ChatId>,
    state: ConnectionState,
    connected_at: Timestamp,
}

impl Connection {
    /// A connection that has passed admission and is about to be registered
    pub fn new(id: ConnectionId, user_id: UserId, outbox: Outbox, connected_at: Timestamp) -> Self {
        Self {
            id,
            user_id,
            outbox,
            rooms: HashSet::new(),
            state: ConnectionState::Authenticated,
            connected_at,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connected_at(&self) -> Timestamp {
        self.connected_at
    }

    pub fn rooms(&self) -> &HashSet<ChatId> {
        &self.rooms
    }

    /// Push without waiting. A full or closed queue is reported, never awaited.
    pub fn try_enqueue(&self, payload: &str) -> EnqueueOutcome {
        match self.outbox.try_send(payload.to_string()) {
            Ok(()) => EnqueueOutcome::Queued,
            Err(TrySendError::Full(_)) => EnqueueOutcome::Full,
            Err(TrySendError::Closed(_)) => EnqueueOutcome::Closed,
        }
    }

    pub(super) fn add_room(&mut self, chat_id: ChatId) -> bool {
        self.rooms.insert(chat_id)
    }

    pub(super) fn take_rooms(&mut self) -> HashSet<ChatId> {
        std::mem::take(&mut self.rooms)
    }

    pub(super) fn transition(&mut self, next: ConnectionState) {
        if self.state.can_transition_to(next) {
            self.state = next;
        } else {
            tracing::warn!(
                "ignoring invalid transition {:?} -> {:?} for {} ({})",
                self.state,
                next,
                self.user_id,
                self.id
            );
        }
    }
}
