//! Repository trait 定義
//!
//! Collaborator ports the core depends on. Concrete adapters live in
//! `crate::infrastructure`; use cases only see these traits.

use std::time::Duration;

use async_trait::async_trait;

use super::{
    ChatId, RepositoryError, Timestamp, UserId,
    entity::{Chat, StoredMessage, User},
};

/// Chat persistence port
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Persist a new chat and return it with its assigned id
    async fn create_chat(
        &self,
        name: String,
        members: Vec<UserId>,
        created_by: UserId,
        created_at: Timestamp,
    ) -> Result<Chat, RepositoryError>;

    /// Look up a chat; `Ok(None)` when it does not exist
    async fn get_chat(&self, chat_id: ChatId) -> Result<Option<Chat>, RepositoryError>;

    /// Chats the user is a member of, ordered by id
    async fn get_user_chats(&self, user_id: &UserId) -> Result<Vec<Chat>, RepositoryError>;

    /// Remove a chat
    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), RepositoryError>;
}

/// Message persistence port
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create_message(&self, message: StoredMessage) -> Result<(), RepositoryError>;

    /// Page through a chat's history, oldest first
    async fn get_messages(
        &self,
        chat_id: ChatId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMessage>, RepositoryError>;

    /// Delete a chat's history, returning how many messages were removed
    async fn delete_messages_by_chat(&self, chat_id: ChatId) -> Result<usize, RepositoryError>;
}

/// Account persistence port
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: User) -> Result<(), RepositoryError>;

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, RepositoryError>;

    /// Look up the account a verification token was issued to
    async fn get_user_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, RepositoryError>;

    /// Flag the account's email as verified
    async fn mark_verified(&self, user_id: &UserId) -> Result<(), RepositoryError>;
}

/// Side store of revoked token fingerprints.
///
/// Entries expire after their TTL; an expired entry no longer counts as revoked.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, RepositoryError>;

    async fn revoke(&self, fingerprint: String, ttl: Duration) -> Result<(), RepositoryError>;
}
