//! InMemory Chat Repository 実装
//!
//! Chats are kept in a `BTreeMap` keyed by id so listings come out ordered.
//! Ids are assigned from a counter starting at 1 and are never reused.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Chat, ChatId, ChatRepository, RepositoryError, Timestamp, UserId};

#[derive(Debug)]
struct ChatTable {
    chats: BTreeMap<ChatId, Chat>,
    next_id: i64,
}

/// インメモリ Chat Repository 実装
#[derive(Debug)]
pub struct InMemoryChatRepository {
    table: Mutex<ChatTable>,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(ChatTable {
                chats: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryChatRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn create_chat(
        &self,
        name: String,
        members: Vec<UserId>,
        created_by: UserId,
        created_at: Timestamp,
    ) -> Result<Chat, RepositoryError> {
        let mut table = self.table.lock().await;
        let id = ChatId::new(table.next_id);
        table.next_id += 1;

        let chat = Chat {
            id,
            name,
            members,
            created_by,
            created_at,
        };
        table.chats.insert(id, chat.clone());
        Ok(chat)
    }

    async fn get_chat(&self, chat_id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        let table = self.table.lock().await;
        Ok(table.chats.get(&chat_id).cloned())
    }

    async fn get_user_chats(&self, user_id: &UserId) -> Result<Vec<Chat>, RepositoryError> {
        let table = self.table.lock().await;
        Ok(table
            .chats
            .values()
            .filter(|chat| chat.is_member(user_id))
            .cloned()
            .collect())
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), RepositoryError> {
        let mut table = self.table.lock().await;
        table
            .chats
            .remove(&chat_id)
            .map(|_| ())
            .ok_or(RepositoryError::ChatNotFound(chat_id.value()))
    }
}
