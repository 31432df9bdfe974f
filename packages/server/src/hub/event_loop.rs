//! The hub actor: a single task that owns every registry mutation.
//!
//! Commands arrive on a bounded channel and are applied in arrival order.
//! Producers wait when the channel is full; the loop itself never waits on a
//! client, since fan-out only uses non-blocking enqueue.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::{
    sync::{RwLock, mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    codec::{ChatMessageEnvelope, Envelope},
    domain::{ChatId, ConnectionId, HubError, MessageHub, Timestamp, UserId},
    telemetry,
};

use super::{
    connection::{Connection, EnqueueOutcome, Outbox},
    registry::{JoinOutcome, Registry},
};

pub const DEFAULT_COMMAND_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub command_capacity: usize,
    /// Deliver a chat message back to its sender as well
    pub echo_to_sender: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            echo_to_sender: true,
        }
    }
}

enum HubCommand {
    Register(Connection),
    Unregister {
        user_id: UserId,
        connection_id: ConnectionId,
    },
    Join {
        chat_id: ChatId,
        user_id: UserId,
    },
    Route(ChatMessageEnvelope),
    Evict {
        user_id: UserId,
        connection_id: ConnectionId,
    },
    Disconnect {
        user_id: UserId,
    },
    IsConnected {
        user_id: UserId,
        reply: oneshot::Sender<bool>,
    },
    RoomMembers {
        chat_id: ChatId,
        reply: oneshot::Sender<Option<Vec<UserId>>>,
    },
    ConnectionCount {
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

pub struct Hub {
    commands: mpsc::Receiver<HubCommand>,
    registry: Arc<RwLock<Registry>>,
    config: HubConfig,
}

impl Hub {
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.command_capacity.max(1));
        let registry = Arc::new(RwLock::new(Registry::new()));

        let hub = Self {
            commands: rx,
            registry: registry.clone(),
            config,
        };
        let handle = HubHandle {
            commands: tx,
            registry,
            next_connection_id: Arc::new(AtomicU64::new(1)),
        };
        (hub, handle)
    }

    /// Build the hub and run its loop on a new task
    pub fn spawn(config: HubConfig) -> (HubHandle, JoinHandle<()>) {
        let (hub, handle) = Self::new(config);
        let task = tokio::spawn(hub.run());
        (handle, task)
    }

    pub async fn run(mut self) {
        tracing::info!(
            "hub started (command capacity: {}, echo to sender: {})",
            self.config.command_capacity,
            self.config.echo_to_sender
        );

        while let Some(command) = self.commands.recv().await {
            if let HubCommand::Shutdown = command {
                break;
            }
            self.apply(command).await;
        }

        let closed = self.registry.write().await.close_all();
        telemetry::set_active_websockets(0);
        tracing::info!("hub stopped, closed {} connection(s)", closed);
    }

    async fn apply(&self, command: HubCommand) {
        match command {
            HubCommand::Register(connection) => {
                let user_id = connection.user_id().clone();
                let connection_id = connection.id();
                let superseded = {
                    let mut registry = self.registry.write().await;
                    let superseded = registry.register(connection);
                    publish_connection_count(&registry);
                    superseded
                };
                match superseded {
                    Some(old) => tracing::info!(
                        "{} registered as {}, superseding {}",
                        user_id,
                        connection_id,
                        old
                    ),
                    None => tracing::info!("{} registered as {}", user_id, connection_id),
                }
            }
            HubCommand::Unregister {
                user_id,
                connection_id,
            } => {
                let removed = {
                    let mut registry = self.registry.write().await;
                    let removed = registry.unregister(&user_id, connection_id);
                    publish_connection_count(&registry);
                    removed
                };
                if removed {
                    tracing::info!("{} unregistered ({})", user_id, connection_id);
                } else {
                    tracing::debug!(
                        "ignoring unregister of stale connection {} for {}",
                        connection_id,
                        user_id
                    );
                }
            }
            HubCommand::Join { chat_id, user_id } => {
                match self.registry.write().await.join(chat_id, &user_id) {
                    JoinOutcome::Joined => tracing::info!("{} joined chat {}", user_id, chat_id),
                    JoinOutcome::AlreadyMember => {
                        tracing::debug!("{} already in chat {}", user_id, chat_id)
                    }
                    JoinOutcome::NotConnected => tracing::warn!(
                        "join of chat {} for {} ignored: not connected",
                        chat_id,
                        user_id
                    ),
                }
            }
            HubCommand::Route(message) => self.route(message).await,
            HubCommand::Evict {
                user_id,
                connection_id,
            } => {
                let evicted = {
                    let mut registry = self.registry.write().await;
                    let evicted = registry.evict(&user_id, connection_id);
                    publish_connection_count(&registry);
                    evicted
                };
                if evicted {
                    tracing::warn!("evicted slow consumer {} ({})", user_id, connection_id);
                }
            }
            HubCommand::Disconnect { user_id } => {
                let closed = {
                    let mut registry = self.registry.write().await;
                    let closed = registry.disconnect(&user_id);
                    publish_connection_count(&registry);
                    closed
                };
                match closed {
                    Some(connection_id) => {
                        tracing::info!("closed connection {} of {}", connection_id, user_id)
                    }
                    None => tracing::debug!("{} has no connection to close", user_id),
                }
            }
            HubCommand::IsConnected { user_id, reply } => {
                let _ = reply.send(self.registry.read().await.is_connected(&user_id));
            }
            HubCommand::RoomMembers { chat_id, reply } => {
                let _ = reply.send(self.registry.read().await.room_members(chat_id));
            }
            HubCommand::ConnectionCount { reply } => {
                let _ = reply.send(self.registry.read().await.connection_count());
            }
            HubCommand::Shutdown => {}
        }
    }

    async fn route(&self, mut message: ChatMessageEnvelope) {
        let chat_id = message.chat_id;
        let Some(sender) = message.sender.clone() else {
            tracing::warn!("dropping chat_message for chat {} without sender", chat_id);
            return;
        };

        // Recipients get the plaintext; the key stays attached for older clients.
        match message.open() {
            Ok(plaintext) => {
                tracing::debug!(
                    "routing message from {} to chat {}: {}",
                    sender,
                    chat_id,
                    plaintext
                );
                message.content = plaintext;
            }
            Err(e) => {
                tracing::error!(
                    "dropping message from {} to chat {}: {}",
                    sender,
                    chat_id,
                    e
                );
                return;
            }
        }

        let payload = match Envelope::ChatMessage(message).to_json() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("failed to encode message for chat {}: {}", chat_id, e);
                return;
            }
        };

        let exclude = (!self.config.echo_to_sender).then_some(&sender);
        let fan_out = {
            let mut registry = self.registry.write().await;
            let fan_out = registry.fan_out(chat_id, &payload, exclude);
            if fan_out.as_ref().is_some_and(|result| !result.evicted.is_empty()) {
                publish_connection_count(&registry);
            }
            fan_out
        };
        match fan_out {
            None => tracing::warn!("chat room {} not found, message from {} dropped", chat_id, sender),
            Some(result) => {
                for evicted in &result.evicted {
                    tracing::warn!("client channel full, closed connection of {}", evicted);
                }
                tracing::debug!(
                    "message to chat {} delivered to {} member(s)",
                    chat_id,
                    result.delivered.len()
                );
            }
        }
    }
}

fn publish_connection_count(registry: &Registry) {
    telemetry::set_active_websockets(registry.connection_count());
}

/// Cloneable front door to the hub
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    registry: Arc<RwLock<Registry>>,
    next_connection_id: Arc<AtomicU64>,
}

impl HubHandle {
    /// Hand a new connection's outbound queue to the hub.
    ///
    /// After this call the hub holds the only strong sender of `outbox`, so
    /// the caller's writer stops once the hub drops it.
    pub async fn register(&self, user_id: UserId, outbox: Outbox) -> Result<ConnectionId, HubError> {
        let connection_id =
            ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        let connection = Connection::new(
            connection_id,
            user_id,
            outbox,
            Timestamp::new(hiroba_shared::time::get_timestamp()),
        );
        self.send(HubCommand::Register(connection)).await?;
        Ok(connection_id)
    }

    pub async fn unregister(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Result<(), HubError> {
        self.send(HubCommand::Unregister {
            user_id,
            connection_id,
        })
        .await
    }

    pub async fn is_connected(&self, user_id: &UserId) -> Result<bool, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::IsConnected {
            user_id: user_id.clone(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    pub async fn room_members(&self, chat_id: ChatId) -> Result<Option<Vec<UserId>>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::RoomMembers { chat_id, reply }).await?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    pub async fn connection_count(&self) -> Result<usize, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::ConnectionCount { reply }).await?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    /// Ask the loop to stop after the commands already queued
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.send(HubCommand::Shutdown).await
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HubError::Stopped)
    }
}

#[async_trait]
impl MessageHub for HubHandle {
    async fn join(&self, chat_id: ChatId, user_id: UserId) -> Result<(), HubError> {
        self.send(HubCommand::Join { chat_id, user_id }).await
    }

    async fn route(&self, envelope: Envelope) -> Result<(), HubError> {
        match envelope {
            Envelope::ChatMessage(message) => self.send(HubCommand::Route(message)).await,
            other => Err(HubError::Unroutable(other.kind())),
        }
    }

    async fn broadcast_to_identity(
        &self,
        user_id: &UserId,
        envelope: &Envelope,
    ) -> Result<(), HubError> {
        let payload = envelope
            .to_json()
            .map_err(|e| HubError::Encode(e.to_string()))?;

        // Read-only delivery; any removal goes back through the loop.
        let outcome = self.registry.read().await.deliver_to(user_id, &payload);
        match outcome {
            None => {
                tracing::debug!("{} not connected, {} not delivered", user_id, envelope.kind());
            }
            Some((_, EnqueueOutcome::Queued)) => {
                tracing::debug!("{} delivered to {}", envelope.kind(), user_id);
            }
            Some((connection_id, EnqueueOutcome::Full | EnqueueOutcome::Closed)) => {
                tracing::warn!(
                    "client channel of {} full or closed, evicting {}",
                    user_id,
                    connection_id
                );
                self.send(HubCommand::Evict {
                    user_id: user_id.clone(),
                    connection_id,
                })
                .await?;
            }
        }
        Ok(())
    }

    async fn disconnect(&self, user_id: &UserId) -> Result<(), HubError> {
        self.send(HubCommand::Disconnect {
            user_id: user_id.clone(),
        })
        .await
    }
}
