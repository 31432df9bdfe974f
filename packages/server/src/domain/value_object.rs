//! Value objects shared by the hub, the token authority and the use cases.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};

use super::error::ValueObjectError;

/// Maximum length of a user identity (username).
pub const MAX_USER_ID_LENGTH: usize = 64;

/// Authenticated user identity (the token's subject / username).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a new `UserId`, rejecting blank or oversized identities
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyUserId);
        }
        if value.chars().count() > MAX_USER_ID_LENGTH {
            return Err(ValueObjectError::UserIdTooLong(MAX_USER_ID_LENGTH));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conversation identifier.
///
/// Clients historically send `chat_id` either as a JSON number or as a numeric
/// string, so deserialization accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChatId(i64);

impl ChatId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChatId {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| ValueObjectError::InvalidChatId(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for ChatId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ChatIdVisitor;

        impl de::Visitor<'_> for ChatIdVisitor {
            type Value = ChatId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a chat id as integer or numeric string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ChatId, E> {
                Ok(ChatId(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ChatId, E> {
                i64::try_from(v)
                    .map(ChatId)
                    .map_err(|_| E::custom("chat id out of range"))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<ChatId, E> {
                if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
                    Ok(ChatId(v as i64))
                } else {
                    Err(E::custom("Invalid chat ID format"))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ChatId, E> {
                v.parse::<ChatId>()
                    .map_err(|_| E::custom("Invalid chat ID format"))
            }
        }

        deserializer.deserialize_any(ChatIdVisitor)
    }
}

/// Per-connection identifier, monotonic within one hub.
///
/// Distinguishes a superseded connection from its replacement for the same user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Unix timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn to_rfc3339(&self) -> String {
        hiroba_shared::time::timestamp_to_rfc3339(self.0)
    }
}
