//! Domain-level error types and the error taxonomy shared by every layer.

use thiserror::Error;

/// Coarse failure class used to decide how a failure is surfaced.
///
/// - `Validation`: malformed envelope or input; logged, dropped, connection stays open
/// - `Authorization`: bad token, non-member access; request refused
/// - `ResourceExhausted`: rate limit hit or outbound queue full; rejected / evicted
/// - `TransientBackend`: collaborator failure; logged and surfaced, hub unaffected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Authorization,
    ResourceExhausted,
    TransientBackend,
}

/// Errors raised while building value objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("user id must not be empty")]
    EmptyUserId,

    #[error("user id must be at most {0} characters")]
    UserIdTooLong(usize),

    #[error("Invalid chat ID format: '{0}'")]
    InvalidChatId(String),
}

/// Errors reported by persistence ports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("chat {0} not found")]
    ChatNotFound(i64),

    #[error("user '{0}' already exists")]
    UserAlreadyExists(String),

    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RepositoryError::ChatNotFound(_)
            | RepositoryError::UserAlreadyExists(_)
            | RepositoryError::UserNotFound(_) => ErrorClass::Validation,
            RepositoryError::Backend(_) => ErrorClass::TransientBackend,
        }
    }
}

/// Errors reported by the hub handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// The event loop has stopped; no further commands are accepted.
    #[error("hub event loop is not running")]
    Stopped,

    /// `route` was given an envelope kind the hub does not fan out.
    #[error("envelope type '{0}' cannot be routed")]
    Unroutable(&'static str),

    #[error("failed to encode envelope: {0}")]
    Encode(String),
}

impl HubError {
    pub fn class(&self) -> ErrorClass {
        match self {
            HubError::Stopped => ErrorClass::TransientBackend,
            HubError::Unroutable(_) | HubError::Encode(_) => ErrorClass::Validation,
        }
    }
}

/// Errors reported by the outbound email port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailError {
    #[error("failed to send email: {0}")]
    Delivery(String),
}
