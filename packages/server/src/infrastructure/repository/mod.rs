pub mod inmemory;

pub use inmemory::{
    InMemoryChatRepository, InMemoryMessageRepository, InMemoryRevocationStore,
    InMemoryUserRepository,
};
