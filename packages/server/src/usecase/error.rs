//! UseCase 層のエラー型

use thiserror::Error;

use crate::{
    auth::AuthError,
    domain::{ChatId, ErrorClass, HubError, RepositoryError},
};

/// Failures of the chat use cases (create, delete, join, send, history).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Chat not found")]
    ChatNotFound(ChatId),

    #[error("You are not a member of this chat")]
    NotMember(ChatId),

    #[error("User '{0}' does not exist")]
    UnknownUser(String),

    #[error("failed to encrypt message: {0}")]
    Encryption(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Hub(#[from] HubError),
}

impl ChatError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ChatError::InvalidInput(_) | ChatError::ChatNotFound(_) | ChatError::UnknownUser(_) => {
                ErrorClass::Validation
            }
            ChatError::NotMember(_) => ErrorClass::Authorization,
            ChatError::Encryption(_) => ErrorClass::TransientBackend,
            ChatError::Repository(e) => e.class(),
            ChatError::Hub(e) => e.class(),
        }
    }

    /// True when a storage backend failed
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, ChatError::Repository(RepositoryError::Backend(_)))
    }
}

/// Failures of registration, login, logout and email verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("username already exists")]
    UsernameTaken,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email not verified. Please check your email for verification link")]
    EmailNotVerified,

    #[error("invalid verification token")]
    InvalidVerificationToken,

    #[error("email already verified")]
    AlreadyVerified,

    #[error("user '{0}' not found")]
    UnknownUser(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl AccountError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AccountError::InvalidInput(_)
            | AccountError::UsernameTaken
            | AccountError::InvalidVerificationToken
            | AccountError::AlreadyVerified
            | AccountError::UnknownUser(_) => ErrorClass::Validation,
            AccountError::InvalidCredentials | AccountError::EmailNotVerified => {
                ErrorClass::Authorization
            }
            AccountError::Auth(e) => e.class(),
            AccountError::Repository(e) => e.class(),
        }
    }

    /// True when a storage backend failed
    pub fn is_storage_failure(&self) -> bool {
        match self {
            AccountError::Repository(RepositoryError::Backend(_)) => true,
            AccountError::Auth(e) => e.is_storage_failure(),
            _ => false,
        }
    }
}
