//! Route handlers.

pub mod auth;
pub mod chat;
pub mod http;
pub mod websocket;

pub use auth::{login, logout, register, verification_status, verification_token, verify_email};
pub use chat::{create_chat, delete_chat, get_chat_messages, get_chats};
pub use http::{health_check, prometheus_metrics};
pub use websocket::websocket_handler;
