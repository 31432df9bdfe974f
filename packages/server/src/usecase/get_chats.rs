//! UseCase: チャット一覧取得

use std::sync::Arc;

use crate::domain::{Chat, ChatRepository, UserId};

use super::error::ChatError;

pub struct GetChatsUseCase {
    chats: Arc<dyn ChatRepository>,
}

impl GetChatsUseCase {
    pub fn new(chats: Arc<dyn ChatRepository>) -> Self {
        Self { chats }
    }

    /// Chats `user_id` belongs to, ordered by id
    pub async fn execute(&self, user_id: &UserId) -> Result<Vec<Chat>, ChatError> {
        let chats = self.chats.get_user_chats(user_id).await?;
        tracing::debug!("{} belongs to {} chat(s)", user_id, chats.len());
        Ok(chats)
    }
}
