//! Message envelope codec: the tagged wire format and the per-message cipher.

pub mod cipher;
pub mod envelope;

pub use cipher::{CipherError, SealedContent};
pub use envelope::{
    ChatCreatedEnvelope, ChatDeletedEnvelope, ChatMessageEnvelope, Envelope, ErrorEnvelope,
    JoinEnvelope,
};
