//! Connection hub: registry of live connections and rooms, driven by one event loop.

pub mod connection;
pub mod event_loop;
pub mod registry;

pub use connection::{Connection, ConnectionState, DEFAULT_OUTBOX_CAPACITY, EnqueueOutcome, Outbox};
pub use event_loop::{DEFAULT_COMMAND_CAPACITY, Hub, HubConfig, HubHandle};
pub use registry::{FanOut, JoinOutcome, Registry};
