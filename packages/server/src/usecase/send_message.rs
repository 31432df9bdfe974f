//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 送信者は常に認証済みユーザーに上書きされること
//! - チャットの永続メンバー以外はメッセージを送れないこと
//! - 履歴には平文、配信には暗号化済みの envelope が使われること
//!
//! ### どのような状況を想定しているか
//! - 正常系：メンバーによる送信
//! - 異常系：空メッセージ、存在しないチャット、非メンバー、ハブ停止

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::{
    codec::{ChatMessageEnvelope, Envelope},
    domain::{
        ChatId, ChatRepository, MessageHub, MessageRepository, StoredMessage, Timestamp, UserId,
    },
};

use super::error::ChatError;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    chats: Arc<dyn ChatRepository>,
    messages: Arc<dyn MessageRepository>,
    hub: Arc<dyn MessageHub>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
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

    /// Persist and route a message from `sender` to `chat_id`.
    ///
    /// Any `sender` the client put in the envelope is ignored; the routed
    /// message is always attributed to the authenticated identity.
    pub async fn execute(
        &self,
        sender: UserId,
        chat_id: ChatId,
        content: String,
    ) -> Result<(), ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::InvalidInput(
                "Message content is required".to_string(),
            ));
        }

        let chat = self
            .chats
            .get_chat(chat_id)
            .await?
            .ok_or(ChatError::ChatNotFound(chat_id))?;
        if !chat.is_member(&sender) {
            tracing::warn!("{} tried to send to chat {} without membership", sender, chat_id);
            return Err(ChatError::NotMember(chat_id));
        }

        let sent_at = Timestamp::new(self.clock.now_millis());

        // 1. 履歴に保存
        self.messages
            .create_message(StoredMessage {
                chat_id,
                sender: sender.clone(),
                content: content.clone(),
                created_at: sent_at,
            })
            .await?;

        // 2. 暗号化してルームへ配信
        let sealed = ChatMessageEnvelope::seal(chat_id, sender, &content, sent_at)
            .map_err(|e| ChatError::Encryption(e.to_string()))?;
        self.hub.route(Envelope::ChatMessage(sealed)).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hiroba_shared::time::FixedClock;

    use super::*;
    use crate::{
        domain::{HubError, MockMessageHub},
        infrastructure::repository::{InMemoryChatRepository, InMemoryMessageRepository},
    };

    const NOW: i64 = 1_700_000_000_000;

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
        (chats, Arc::new(InMemoryMessageRepository::new()))
    }

    fn create_usecase(
        chats: Arc<InMemoryChatRepository>,
        messages: Arc<InMemoryMessageRepository>,
        hub: MockMessageHub,
    ) -> SendMessageUseCase {
        SendMessageUseCase::new(chats, messages, Arc::new(hub), Arc::new(FixedClock::new(NOW)))
    }

    #[tokio::test]
    async fn test_send_message_persists_and_routes_sealed_envelope() {
        // テスト項目: 履歴には平文が保存され、ハブには暗号化済みの envelope が渡る
        // given (前提条件):
        let (chats, messages) = create_fixture().await;
        let mut hub = MockMessageHub::new();
        hub.expect_route()
            .withf(|envelope| match envelope {
                Envelope::ChatMessage(message) => {
                    message.sender == Some(UserId::new("alice".to_string()).unwrap())
                        && message.content != "hello"
                        && message.open().is_ok_and(|text| text == "hello")
                        && message.timestamp.is_some()
                }
                _ => false,
            })
            .times(1)
            .returning(|_| Ok(()));
        let usecase = create_usecase(chats, messages.clone(), hub);

        // when (操作):
        let result = usecase
            .execute(user("alice"), ChatId::new(1), "hello".to_string())
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        let history = messages.get_messages(ChatId::new(1), 50, 0).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[0].sender, user("alice"));
        assert_eq!(history[0].created_at, Timestamp::new(NOW));
    }

    #[tokio::test]
    async fn test_send_message_rejects_non_member() {
        // テスト項目: 永続メンバーでないユーザーの送信は拒否され、配信されない
        // given (前提条件):
        let (chats, messages) = create_fixture().await;
        let mut hub = MockMessageHub::new();
        hub.expect_route().never();
        let usecase = create_usecase(chats, messages.clone(), hub);

        // when (操作):
        let result = usecase
            .execute(user("mallory"), ChatId::new(1), "hi".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(ChatError::NotMember(ChatId::new(1))));
        assert!(messages.get_messages(ChatId::new(1), 50, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_message_to_unknown_chat() {
        // テスト項目: 存在しないチャットへの送信は ChatNotFound
        // given (前提条件):
        let (chats, messages) = create_fixture().await;
        let mut hub = MockMessageHub::new();
        hub.expect_route().never();
        let usecase = create_usecase(chats, messages, hub);

        // when (操作):
        let result = usecase
            .execute(user("alice"), ChatId::new(42), "hi".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(ChatError::ChatNotFound(ChatId::new(42))));
    }

    #[tokio::test]
    async fn test_send_empty_message() {
        // テスト項目: 空白のみのメッセージは入力エラー
        // given (前提条件):
        let (chats, messages) = create_fixture().await;
        let mut hub = MockMessageHub::new();
        hub.expect_route().never();
        let usecase = create_usecase(chats, messages, hub);

        // when (操作):
        let result = usecase
            .execute(user("alice"), ChatId::new(1), "   ".to_string())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ChatError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_send_message_when_hub_stopped() {
        // テスト項目: ハブ停止時はエラーが伝播する
        // given (前提条件):
        let (chats, messages) = create_fixture().await;
        let mut hub = MockMessageHub::new();
        hub.expect_route().returning(|_| Err(HubError::Stopped));
        let usecase = create_usecase(chats, messages, hub);

        // when (操作):
        let result = usecase
            .execute(user("bob"), ChatId::new(1), "hi".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(ChatError::Hub(HubError::Stopped)));
    }
}
