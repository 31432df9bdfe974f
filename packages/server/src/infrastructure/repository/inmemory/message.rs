//! InMemory Message Repository 実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ChatId, MessageRepository, RepositoryError, StoredMessage};

/// Per-chat message history in arrival order
#[derive(Debug, Default)]
pub struct InMemoryMessageRepository {
    messages: Mutex<HashMap<ChatId, Vec<StoredMessage>>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create_message(&self, message: StoredMessage) -> Result<(), RepositoryError> {
        let mut messages = self.messages.lock().await;
        messages.entry(message.chat_id).or_default().push(message);
        Ok(())
    }

    async fn get_messages(
        &self,
        chat_id: ChatId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        let messages = self.messages.lock().await;
        Ok(messages
            .get(&chat_id)
            .map(|history| history.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_messages_by_chat(&self, chat_id: ChatId) -> Result<usize, RepositoryError> {
        let mut messages = self.messages.lock().await;
        Ok(messages.remove(&chat_id).map(|h| h.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Timestamp, UserId};

    fn message(chat_id: i64, content: &str, at: i64) -> StoredMessage {
        StoredMessage {
            chat_id: ChatId::new(chat_id),
            sender: UserId::new("alice".to_string()).unwrap(),
            content: content.to_string(),
            created_at: Timestamp::new(at),
        }
    }

    #[tokio::test]
    async fn test_get_messages_pages_oldest_first() {
        // テスト項目: limit / offset で古い順にページングできる
        // given (前提条件):
        let repo = InMemoryMessageRepository::new();
        for i in 0..5 {
            repo.create_message(message(1, &format!("m{}", i), i))
                .await
                .unwrap();
        }
        repo.create_message(message(2, "other", 0)).await.unwrap();

        // when (操作):
        let page = repo.get_messages(ChatId::new(1), 2, 1).await.unwrap();

        // then (期待する結果):
        let contents: Vec<&str> = page.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_get_messages_of_unknown_chat_is_empty() {
        // テスト項目: 履歴のないチャットは空の配列
        // given (前提条件):
        let repo = InMemoryMessageRepository::new();

        // when (操作):
        let page = repo.get_messages(ChatId::new(9), 50, 0).await.unwrap();

        // then (期待する結果):
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_delete_messages_by_chat() {
        // テスト項目: 指定チャットの履歴だけが削除され、件数が返る
        // given (前提条件):
        let repo = InMemoryMessageRepository::new();
        repo.create_message(message(1, "a", 0)).await.unwrap();
        repo.create_message(message(1, "b", 1)).await.unwrap();
        repo.create_message(message(2, "c", 2)).await.unwrap();

        // when (操作):
        let deleted = repo.delete_messages_by_chat(ChatId::new(1)).await.unwrap();

        // then (期待する結果):
        assert_eq!(deleted, 2);
        assert!(repo.get_messages(ChatId::new(1), 50, 0).await.unwrap().is_empty());
        assert_eq!(repo.get_messages(ChatId::new(2), 50, 0).await.unwrap().len(), 1);
    }
}
