//! In-memory adapters backed by `tokio::sync::Mutex` maps.
//!
//! State lives for the process lifetime only.

mod chat;
mod message;
mod revocation;
mod user;

pub use chat::InMemoryChatRepository;
pub use message::InMemoryMessageRepository;
pub use revocation::InMemoryRevocationStore;
pub use user::InMemoryUserRepository;
