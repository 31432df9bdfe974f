//! UI 層: HTTP / WebSocket のエントリポイント

pub mod error;
pub mod extractor;
pub mod handler;
pub mod middleware;
pub mod server;
pub mod signal;
pub mod state;

pub use error::ApiError;
pub use server::Server;
pub use state::{AppState, Repositories};
