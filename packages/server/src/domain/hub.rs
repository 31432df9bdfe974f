//! Hub port used by the use cases.

use async_trait::async_trait;

use crate::codec::Envelope;

use super::{ChatId, HubError, UserId};

/// Delivery surface of the connection hub.
///
/// Implemented by `crate::hub::HubHandle`; use cases depend on this trait so
/// they can be tested without a running event loop.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageHub: Send + Sync {
    /// Add `user_id` to the live room for `chat_id`
    async fn join(&self, chat_id: ChatId, user_id: UserId) -> Result<(), HubError>;

    /// Fan a `chat_message` envelope out to the room's live members
    async fn route(&self, envelope: Envelope) -> Result<(), HubError>;

    /// Out-of-band delivery to one identity (chat created / deleted notifications)
    async fn broadcast_to_identity(
        &self,
        user_id: &UserId,
        envelope: &Envelope,
    ) -> Result<(), HubError>;

    /// Close the identity's live connection, if any (logout)
    async fn disconnect(&self, user_id: &UserId) -> Result<(), HubError>;
}
