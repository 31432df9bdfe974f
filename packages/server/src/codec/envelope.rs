//! WebSocket envelope DTOs.
//!
//! One variant per message kind, discriminated by the `type` field. Inbound
//! frames from older clients use `join_chat` / `message`; both are accepted as
//! aliases.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatId, Timestamp, UserId};

use super::cipher::{self, CipherError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    #[serde(alias = "join_chat")]
    Join(JoinEnvelope),
    #[serde(alias = "message")]
    ChatMessage(ChatMessageEnvelope),
    Error(ErrorEnvelope),
    ChatCreated(ChatCreatedEnvelope),
    ChatDeleted(ChatDeletedEnvelope),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEnvelope {
    pub chat_id: ChatId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageEnvelope {
    pub chat_id: ChatId,
    /// Always overwritten with the authenticated identity before routing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserId>,
    /// Plaintext on the wire; base64 ciphertext between `seal` and hub fan-out
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCreatedEnvelope {
    pub chat_id: ChatId,
    pub chat_name: String,
    pub members: Vec<UserId>,
    pub created_by: UserId,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDeletedEnvelope {
    pub chat_id: ChatId,
    pub chat_name: String,
    pub members: Vec<UserId>,
    pub deleted_by: UserId,
    pub timestamp: String,
}

impl Envelope {
    /// Wire name of the variant (the `type` field)
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Join(_) => "join",
            Envelope::ChatMessage(_) => "chat_message",
            Envelope::Error(_) => "error",
            Envelope::ChatCreated(_) => "chat_created",
            Envelope::ChatDeleted(_) => "chat_deleted",
        }
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        match self {
            Envelope::Join(e) => Some(e.chat_id),
            Envelope::ChatMessage(e) => Some(e.chat_id),
            Envelope::Error(e) => e.chat_id,
            Envelope::ChatCreated(e) => Some(e.chat_id),
            Envelope::ChatDeleted(e) => Some(e.chat_id),
        }
    }

    pub fn error(message: impl Into<String>, chat_id: Option<ChatId>) -> Self {
        Envelope::Error(ErrorEnvelope {
            error: message.into(),
            chat_id,
            details: None,
        })
    }

    pub fn error_with_details(
        message: impl Into<String>,
        chat_id: Option<ChatId>,
        details: impl Into<String>,
    ) -> Self {
        Envelope::Error(ErrorEnvelope {
            error: message.into(),
            chat_id,
            details: Some(details.into()),
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ChatMessageEnvelope {
    /// Build an outbound message: encrypt `plaintext` under a fresh key and
    /// attribute it to `sender`.
    pub fn seal(
        chat_id: ChatId,
        sender: UserId,
        plaintext: &str,
        sent_at: Timestamp,
    ) -> Result<Self, CipherError> {
        let sealed = cipher::seal(plaintext)?;
        Ok(Self {
            chat_id,
            sender: Some(sender),
            content: sealed.content,
            key: Some(sealed.key),
            timestamp: Some(sent_at.to_rfc3339()),
        })
    }

    /// Decrypt the content with the attached key
    pub fn open(&self) -> Result<String, CipherError> {
        let key = self.key.as_deref().ok_or(CipherError::MissingKey)?;
        cipher::open(key, &self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> UserId {
        UserId::new(name.to_string()).unwrap()
    }

    #[test]
    fn test_decode_join_with_legacy_type_name() {
        // テスト項目: 旧形式の join_chat と文字列の chat_id を受け付ける
        // given (前提条件):
        let text = r#"{"type":"join_chat","chat_id":"7"}"#;

        // when (操作):
        let envelope = Envelope::from_json(text).unwrap();

        // then (期待する結果):
        assert_eq!(
            envelope,
            Envelope::Join(JoinEnvelope {
                chat_id: ChatId::new(7),
                sender: None,
            })
        );
        assert_eq!(envelope.kind(), "join");
    }

    #[test]
    fn test_decode_inbound_chat_message() {
        // テスト項目: クライアントからの平文メッセージを読み取れる
        // given (前提条件):
        let text = r#"{"type":"message","chat_id":3,"content":"hi"}"#;

        // when (操作):
        let envelope = Envelope::from_json(text).unwrap();

        // then (期待する結果):
        match envelope {
            Envelope::ChatMessage(msg) => {
                assert_eq!(msg.chat_id, ChatId::new(3));
                assert_eq!(msg.content, "hi");
                assert_eq!(msg.key, None);
                assert_eq!(msg.sender, None);
            }
            other => panic!("unexpected envelope: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        // テスト項目: 未知の type はエラーになる
        // given (前提条件):
        let text = r#"{"type":"typing","chat_id":3}"#;

        // when (操作):
        let result = Envelope::from_json(text);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_missing_chat_id() {
        // テスト項目: chat_id のない join はエラーになる
        // given (前提条件):
        let text = r#"{"type":"join"}"#;

        // when (操作):
        let result = Envelope::from_json(text);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_sealed_message_wire_shape() {
        // テスト項目: 暗号化済みメッセージが key と sender を含む形で送信される
        // given (前提条件):
        let envelope = Envelope::ChatMessage(
            ChatMessageEnvelope::seal(ChatId::new(1), user("alice"), "hello", Timestamp::new(0))
                .unwrap(),
        );

        // when (操作):
        let json: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(json["type"], "chat_message");
        assert_eq!(json["chat_id"], 1);
        assert_eq!(json["sender"], "alice");
        assert_eq!(json["timestamp"], "1970-01-01T00:00:00+00:00");
        assert!(json["key"].is_string());
        assert_ne!(json["content"], "hello");
    }

    #[test]
    fn test_sealed_message_opens_after_wire_transit() {
        // テスト項目: JSON を経由しても添付鍵で復号できる
        // given (前提条件):
        let sealed =
            ChatMessageEnvelope::seal(ChatId::new(9), user("bob"), "Hello world", Timestamp::new(0))
                .unwrap();
        let text = Envelope::ChatMessage(sealed).to_json().unwrap();

        // when (操作):
        let decoded = match Envelope::from_json(&text).unwrap() {
            Envelope::ChatMessage(msg) => msg,
            other => panic!("unexpected envelope: {:?}", other),
        };

        // then (期待する結果):
        assert_eq!(decoded.open().unwrap(), "Hello world");
    }

    #[test]
    fn test_open_without_key_fails() {
        // テスト項目: 鍵のないメッセージは復号できない
        // given (前提条件):
        let msg = ChatMessageEnvelope {
            chat_id: ChatId::new(1),
            sender: None,
            content: "plain".to_string(),
            key: None,
            timestamp: None,
        };

        // when (操作):
        let result = msg.open();

        // then (期待する結果):
        assert_eq!(result, Err(CipherError::MissingKey));
    }

    #[test]
    fn test_error_envelope_serialization() {
        // テスト項目: error エンベロープが error と chat_id を含む
        // given (前提条件):
        let envelope = Envelope::error("Invalid chat ID format", Some(ChatId::new(5)));

        // when (操作):
        let json: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(json["type"], "error");
        assert_eq!(json["error"], "Invalid chat ID format");
        assert_eq!(json["chat_id"], 5);
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_chat_created_serialization() {
        // テスト項目: chat_created 通知のフィールドが揃っている
        // given (前提条件):
        let envelope = Envelope::ChatCreated(ChatCreatedEnvelope {
            chat_id: ChatId::new(2),
            chat_name: "General".to_string(),
            members: vec![user("alice"), user("bob")],
            created_by: user("alice"),
            timestamp: "2025-01-01T00:00:00+00:00".to_string(),
        });

        // when (操作):
        let json: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(json["type"], "chat_created");
        assert_eq!(json["chat_name"], "General");
        assert_eq!(json["members"], serde_json::json!(["alice", "bob"]));
        assert_eq!(json["created_by"], "alice");
    }
}
