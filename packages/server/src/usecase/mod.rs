//! UseCase 層: ドメインの操作を組み合わせたアプリケーション固有の処理

pub mod account;
pub mod create_chat;
pub mod delete_chat;
pub mod error;
pub mod get_chats;
pub mod get_messages;
pub mod join_chat;
pub mod send_message;
pub mod verification;

pub use account::{LoginUseCase, LogoutUseCase, RegisterUserUseCase};
pub use create_chat::CreateChatUseCase;
pub use delete_chat::DeleteChatUseCase;
pub use error::{AccountError, ChatError};
pub use get_chats::GetChatsUseCase;
pub use get_messages::GetMessagesUseCase;
pub use join_chat::JoinChatUseCase;
pub use send_message::SendMessageUseCase;
pub use verification::VerifyEmailUseCase;
