//! UseCase: メッセージ履歴取得

use std::sync::Arc;

use crate::domain::{ChatId, ChatRepository, MessageRepository, StoredMessage, UserId};

use super::error::ChatError;

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 100;

pub struct GetMessagesUseCase {
    chats: Arc<dyn ChatRepository>,
    messages: Arc<dyn MessageRepository>,
}

impl GetMessagesUseCase {
    pub fn new(chats: Arc<dyn ChatRepository>, messages: Arc<dyn MessageRepository>) -> Self {
        Self { chats, messages }
    }

    /// A page of history for a member of the chat.
    ///
    /// A missing or zero `limit` means `DEFAULT_PAGE_LIMIT`; anything above
    /// `MAX_PAGE_LIMIT` is capped.
    pub async fn execute(
        &self,
        requester: &UserId,
        chat_id: ChatId,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<StoredMessage>, ChatError> {
        let chat = self
            .chats
            .get_chat(chat_id)
            .await?
            .ok_or(ChatError::ChatNotFound(chat_id))?;
        if !chat.is_member(requester) {
            return Err(ChatError::NotMember(chat_id));
        }

        let limit = match limit {
            Some(0) | None => DEFAULT_PAGE_LIMIT,
            Some(n) => n.min(MAX_PAGE_LIMIT),
        };
        let offset = offset.unwrap_or(0);

        let messages = self.messages.get_messages(chat_id, limit, offset).await?;
        tracing::debug!(
            "returning {} message(s) of chat {} (limit {}, offset {})",
            messages.len(),
            chat_id,
            limit,
            offset
        );
        Ok(messages)
    }
}
