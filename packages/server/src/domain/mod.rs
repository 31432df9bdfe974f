//! Domain layer: value objects, entities, errors and the ports the core needs.

pub mod email;
pub mod entity;
pub mod error;
pub mod hub;
pub mod repository;
pub mod value_object;

pub use email::EmailSender;
pub use entity::{Chat, StoredMessage, User};
pub use error::{EmailError, ErrorClass, HubError, RepositoryError, ValueObjectError};
pub use hub::MessageHub;
pub use repository::{ChatRepository, MessageRepository, RevocationStore, UserRepository};
pub use value_object::{ChatId, ConnectionId, Timestamp, UserId};

#[cfg(test)]
pub use email::MockEmailSender;
#[cfg(test)]
pub use hub::MockMessageHub;
#[cfg(test)]
pub use repository::{
    MockChatRepository, MockMessageRepository, MockRevocationStore, MockUserRepository,
};
