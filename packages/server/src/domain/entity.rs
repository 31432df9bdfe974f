//! Persisted entities handled by the collaborator ports.

use serde::Serialize;

use super::value_object::{ChatId, Timestamp, UserId};

/// A group conversation as persisted by the chat repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    pub members: Vec<UserId>,
    pub created_by: UserId,
    pub created_at: Timestamp,
}

impl Chat {
    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.iter().any(|member| member == user_id)
    }
}

/// A stored chat message (plaintext; confidentiality ends at the socket).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredMessage {
    pub chat_id: ChatId,
    pub sender: UserId,
    pub content: String,
    pub created_at: Timestamp,
}

/// A registered account. `password_hash` is a PHC string.
///
/// Login is refused until the email address has been verified with
/// `verification_token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub password_hash: String,
    pub email: String,
    pub email_verified: bool,
    pub verification_token: Option<String>,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_is_member() {
        // テスト項目: メンバー判定が正しく行われる
        // given (前提条件):
        let alice = UserId::new("alice".to_string()).unwrap();
        let bob = UserId::new("bob".to_string()).unwrap();
        let eve = UserId::new("eve".to_string()).unwrap();
        let chat = Chat {
            id: ChatId::new(1),
            name: "General".to_string(),
            members: vec![alice.clone(), bob.clone()],
            created_by: alice.clone(),
            created_at: Timestamp::new(0),
        };

        // when (操作) / then (期待する結果):
        assert!(chat.is_member(&alice));
        assert!(chat.is_member(&bob));
        assert!(!chat.is_member(&eve));
    }
}
