//! UseCase: チャット作成処理
//!
//! The creator is always a member. Every other member that is online gets a
//! `chat_created` notification; offline members see the chat on their next
//! listing.

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::{
    codec::{ChatCreatedEnvelope, Envelope},
    domain::{Chat, ChatRepository, MessageHub, Timestamp, UserId, UserRepository},
};

use super::error::ChatError;

/// Smallest allowed member count, creator included
pub const MIN_CHAT_MEMBERS: usize = 2;

/// チャット作成のユースケース
pub struct CreateChatUseCase {
    chats: Arc<dyn ChatRepository>,
    users: Arc<dyn UserRepository>,
    hub: Arc<dyn MessageHub>,
    clock: Arc<dyn Clock>,
}

impl CreateChatUseCase {
    pub fn new(
        chats: Arc<dyn ChatRepository>,
        users: Arc<dyn UserRepository>,
        hub: Arc<dyn MessageHub>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            chats,
            users,
            hub,
            clock,
        }
    }

    pub async fn execute(
        &self,
        creator: UserId,
        chat_name: String,
        member_ids: Vec<UserId>,
    ) -> Result<Chat, ChatError> {
        let chat_name = chat_name.trim().to_string();
        if chat_name.is_empty() {
            return Err(ChatError::InvalidInput("Chat name is required".to_string()));
        }

        let mut members: Vec<UserId> = Vec::with_capacity(member_ids.len() + 1);
        for member in member_ids.into_iter().chain(std::iter::once(creator.clone())) {
            if !members.contains(&member) {
                members.push(member);
            }
        }
        if members.len() < MIN_CHAT_MEMBERS {
            return Err(ChatError::InvalidInput(format!(
                "A chat needs at least {} members",
                MIN_CHAT_MEMBERS
            )));
        }

        for member in &members {
            if self.users.get_user(member).await?.is_none() {
                return Err(ChatError::UnknownUser(member.as_str().to_string()));
            }
        }

        let chat = self
            .chats
            .create_chat(
                chat_name,
                members,
                creator.clone(),
                Timestamp::new(self.clock.now_millis()),
            )
            .await?;
        tracing::info!(
            "chat {} '{}' created by {} with {} member(s)",
            chat.id,
            chat.name,
            creator,
            chat.members.len()
        );

        let notification = Envelope::ChatCreated(ChatCreatedEnvelope {
            chat_id: chat.id,
            chat_name: chat.name.clone(),
            members: chat.members.clone(),
            created_by: creator.clone(),
            timestamp: chat.created_at.to_rfc3339(),
        });
        for member in chat.members.iter().filter(|member| **member != creator) {
            if let Err(e) = self.hub.broadcast_to_identity(member, &notification).await {
                tracing::warn!("failed to notify {} about chat {}: {}", member, chat.id, e);
            }
        }

        Ok(chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatId, HubError, MockMessageHub, User},
        infrastructure::repository::{InMemoryChatRepository, InMemoryUserRepository},
    };
    use hiroba_shared::time::FixedClock;

    fn user(name: &str) -> UserId {
        UserId::new(name.to_string()).unwrap()
    }

    async fn create_users(names: &[&str]) -> Arc<InMemoryUserRepository> {
        let users = Arc::new(InMemoryUserRepository::new());
        for name in names {
            users
                .create_user(User {
                    id: user(name),
                    password_hash: String::new(),
                    email: format!("{}@example.com", name),
                    email_verified: true,
                    verification_token: None,
                    created_at: Timestamp::new(0),
                })
                .await
                .unwrap();
        }
        users
    }

    fn create_usecase(
        chats: Arc<InMemoryChatRepository>,
        users: Arc<InMemoryUserRepository>,
        hub: MockMessageHub,
    ) -> CreateChatUseCase {
        CreateChatUseCase::new(chats, users, Arc::new(hub), Arc::new(FixedClock::new(0)))
    }

    #[tokio::test]
    async fn test_create_chat_adds_creator_and_notifies_others() {
        // テスト項目: 作成者がメンバーに追加され、作成者以外に chat_created が通知される
        // given (前提条件):
        let chats = Arc::new(InMemoryChatRepository::new());
        let users = create_users(&["alice", "bob", "carol"]).await;
        let mut hub = MockMessageHub::new();
        hub.expect_broadcast_to_identity()
            .withf(|target, envelope| {
                target.as_str() != "alice"
                    && matches!(envelope, Envelope::ChatCreated(e) if e.chat_name == "Team")
            })
            .times(2)
            .returning(|_, _| Ok(()));
        let usecase = create_usecase(chats.clone(), users, hub);

        // when (操作):
        let chat = usecase
            .execute(
                user("alice"),
                "Team".to_string(),
                vec![user("bob"), user("carol")],
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(chat.id, ChatId::new(1));
        assert_eq!(chat.members, vec![user("bob"), user("carol"), user("alice")]);
        assert_eq!(chat.created_by, user("alice"));
        assert_eq!(chats.get_chat(chat.id).await.unwrap(), Some(chat));
    }

    #[tokio::test]
    async fn test_create_chat_deduplicates_members() {
        // テスト項目: 重複したメンバー (作成者を含む) は 1 人として扱われる
        // given (前提条件):
        let chats = Arc::new(InMemoryChatRepository::new());
        let users = create_users(&["alice", "bob"]).await;
        let mut hub = MockMessageHub::new();
        hub.expect_broadcast_to_identity()
            .times(1)
            .returning(|_, _| Ok(()));
        let usecase = create_usecase(chats, users, hub);

        // when (操作):
        let chat = usecase
            .execute(
                user("alice"),
                "Pair".to_string(),
                vec![user("bob"), user("alice"), user("bob")],
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(chat.members, vec![user("bob"), user("alice")]);
    }

    #[tokio::test]
    async fn test_create_chat_requires_two_members() {
        // テスト項目: 作成者だけのチャットは作れない
        // given (前提条件):
        let users = create_users(&["alice"]).await;
        let mut hub = MockMessageHub::new();
        hub.expect_broadcast_to_identity().never();
        let usecase = create_usecase(Arc::new(InMemoryChatRepository::new()), users, hub);

        // when (操作):
        let result = usecase
            .execute(user("alice"), "Solo".to_string(), vec![])
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ChatError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_chat_requires_name() {
        // テスト項目: チャット名が空白のみの場合は入力エラー
        // given (前提条件):
        let users = create_users(&["alice", "bob"]).await;
        let usecase = create_usecase(
            Arc::new(InMemoryChatRepository::new()),
            users,
            MockMessageHub::new(),
        );

        // when (操作):
        let result = usecase
            .execute(user("alice"), "  ".to_string(), vec![user("bob")])
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ChatError::InvalidInput("Chat name is required".to_string()))
        );
    }

    #[tokio::test]
    async fn test_create_chat_with_unknown_member() {
        // テスト項目: 存在しないユーザーを含むチャットは作成されない
        // given (前提条件):
        let chats = Arc::new(InMemoryChatRepository::new());
        let users = create_users(&["alice"]).await;
        let usecase = create_usecase(chats.clone(), users, MockMessageHub::new());

        // when (操作):
        let result = usecase
            .execute(user("alice"), "Team".to_string(), vec![user("ghost")])
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(ChatError::UnknownUser("ghost".to_string())));
        assert!(chats.get_user_chats(&user("alice")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_creation() {
        // テスト項目: 通知に失敗してもチャット作成自体は成功する
        // given (前提条件):
        let users = create_users(&["alice", "bob"]).await;
        let mut hub = MockMessageHub::new();
        hub.expect_broadcast_to_identity()
            .returning(|_, _| Err(HubError::Stopped));
        let usecase = create_usecase(Arc::new(InMemoryChatRepository::new()), users, hub);

        // when (操作):
        let result = usecase
            .execute(user("alice"), "Team".to_string(), vec![user("bob")])
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
    }
}
