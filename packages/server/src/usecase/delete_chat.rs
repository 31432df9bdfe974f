//! UseCase: チャット削除処理

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::{
    codec::{ChatDeletedEnvelope, Envelope},
    domain::{ChatId, ChatRepository, MessageHub, MessageRepository, Timestamp, UserId},
};

use super::error::ChatError;

/// チャット削除のユースケース
///
/// Any member may delete a chat. Its history goes with it, and every member
/// (the deleting one included) is told with `chat_deleted`.
pub struct DeleteChatUseCase {
    chats: Arc<dyn ChatRepository>,
    messages: Arc<dyn MessageRepository>,
    hub: Arc<dyn MessageHub>,
    clock: Arc<dyn Clock>,
}

impl DeleteChatUseCase {
    pub fn new(
        chats: Arc<dyn ChatRepository>,
        messages: Arc<dyn MessageRepository>,
        hub: Arc<dyn MessageHub>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            chats,
            messages,
            hub,
            clock,
        }
    }

    pub async fn execute(&self, requester: UserId, chat_id: ChatId) -> Result<(), ChatError> {
        let chat = self
            .chats
            .get_chat(chat_id)
            .await?
            .ok_or(ChatError::ChatNotFound(chat_id))?;
        if !chat.is_member(&requester) {
            return Err(ChatError::NotMember(chat_id));
        }

        let removed = self.messages.delete_messages_by_chat(chat_id).await?;
        self.chats.delete_chat(chat_id).await?;
        tracing::info!(
            "chat {} deleted by {} ({} message(s) removed)",
            chat_id,
            requester,
            removed
        );

        let notification = Envelope::ChatDeleted(ChatDeletedEnvelope {
            chat_id,
            chat_name: chat.name.clone(),
            members: chat.members.clone(),
            deleted_by: requester,
            timestamp: Timestamp::new(self.clock.now_millis()).to_rfc3339(),
        });
        for member in &chat.members {
            if let Err(e) = self.hub.broadcast_to_identity(member, &notification).await {
                tracing::warn!("failed to notify {} about deletion of chat {}: {}", member, chat_id, e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hiroba_shared::time::FixedClock;

    use super::*;
    use crate::{
        domain::{MockMessageHub, StoredMessage},
        infrastructure::repository::{InMemoryChatRepository, InMemoryMessageRepository},
    };

    fn user(name: &str) -> UserId {
        UserId::new(name.to_string()).unwrap()
    }

    async fn create_fixture() -> (Arc<InMemoryChatRepository>, Arc<InMemoryMessageRepository>) {
        let chats = Arc::new(InMemoryChatRepository::new());
        chats
            .create_chat(
                "General".to_string(),
                vec![user("alice"), user("bob")],
                user("alice"),
                Timestamp::new(0),
            )
            .await
            .unwrap();
        let messages = Arc::new(InMemoryMessageRepository::new());
        messages
            .create_message(StoredMessage {
                chat_id: ChatId::new(1),
                sender: user("alice"),
                content: "hello".to_string(),
                created_at: Timestamp::new(0),
            })
            .await
            .unwrap();
        (chats, messages)
    }

    #[tokio::test]
    async fn test_member_deletes_chat_and_history() {
        // テスト項目: メンバーが削除するとチャットと履歴が消え、全メンバーに通知される
        // given (前提条件):
        let (chats, messages) = create_fixture().await;
        let mut hub = MockMessageHub::new();
        hub.expect_broadcast_to_identity()
            .withf(|_, envelope| {
                matches!(envelope, Envelope::ChatDeleted(e) if e.deleted_by.as_str() == "bob")
            })
            .times(2)
            .returning(|_, _| Ok(()));
        let usecase = DeleteChatUseCase::new(
            chats.clone(),
            messages.clone(),
            Arc::new(hub),
            Arc::new(FixedClock::new(0)),
        );

        // when (操作):
        let result = usecase.execute(user("bob"), ChatId::new(1)).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(chats.get_chat(ChatId::new(1)).await.unwrap(), None);
        assert!(messages.get_messages(ChatId::new(1), 50, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_member_cannot_delete() {
        // テスト項目: 非メンバーは削除できず、チャットは残る
        // given (前提条件):
        let (chats, messages) = create_fixture().await;
        let mut hub = MockMessageHub::new();
        hub.expect_broadcast_to_identity().never();
        let usecase = DeleteChatUseCase::new(
            chats.clone(),
            messages,
            Arc::new(hub),
            Arc::new(FixedClock::new(0)),
        );

        // when (操作):
        let result = usecase.execute(user("mallory"), ChatId::new(1)).await;

        // then (期待する結果):
        assert_eq!(result, Err(ChatError::NotMember(ChatId::new(1))));
        assert!(chats.get_chat(ChatId::new(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_unknown_chat() {
        // テスト項目: 存在しないチャットの削除は ChatNotFound
        // given (前提条件):
        let (chats, messages) = create_fixture().await;
        let usecase = DeleteChatUseCase::new(
            chats,
            messages,
            Arc::new(MockMessageHub::new()),
            Arc::new(FixedClock::new(0)),
        );

        // when (操作):
        let result = usecase.execute(user("alice"), ChatId::new(99)).await;

        // then (期待する結果):
        assert_eq!(result, Err(ChatError::ChatNotFound(ChatId::new(99))));
    }
}
