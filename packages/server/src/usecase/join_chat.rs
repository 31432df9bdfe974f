//! UseCase: ルーム参加処理
//!
//! A live room join is only accepted for persisted members of the chat.

use std::sync::Arc;

use crate::domain::{ChatId, ChatRepository, MessageHub, UserId};

use super::error::ChatError;

/// ルーム参加のユースケース
pub struct JoinChatUseCase {
    chats: Arc<dyn ChatRepository>,
    hub: Arc<dyn MessageHub>,
}

impl JoinChatUseCase {
    pub fn new(chats: Arc<dyn ChatRepository>, hub: Arc<dyn MessageHub>) -> Self {
        Self { chats, hub }
    }

    pub async fn execute(&self, user_id: UserId, chat_id: ChatId) -> Result<(), ChatError> {
        let chat = self
            .chats
            .get_chat(chat_id)
            .await?
            .ok_or(ChatError::ChatNotFound(chat_id))?;
        if !chat.is_member(&user_id) {
            tracing::warn!("{} tried to join chat {} without membership", user_id, chat_id);
            return Err(ChatError::NotMember(chat_id));
        }

        self.hub.join(chat_id, user_id).await?;
        Ok(())
    }
}
