//! Authentication: session tokens, admission rate limiting and password hashing.

pub mod password;
pub mod rate_limiter;
pub mod token;

use thiserror::Error;

use crate::domain::ErrorClass;

pub use rate_limiter::SlidingWindowLimiter;
pub use token::{IssuedToken, SessionClaims, TokenAuthority, fingerprint};

/// Token and credential failures. Each validation step has its own kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token is required")]
    EmptyToken,

    #[error("token revoked")]
    Revoked,

    #[error("invalid token: {0}")]
    Malformed(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("{0} missing in token")]
    MissingClaim(&'static str),

    #[error("token revocation check failed: {0}")]
    Store(String),

    #[error("token generation failed: {0}")]
    Signing(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl AuthError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AuthError::EmptyToken
            | AuthError::Revoked
            | AuthError::Malformed(_)
            | AuthError::InvalidSignature
            | AuthError::Expired
            | AuthError::MissingClaim(_) => ErrorClass::Authorization,
            AuthError::Store(_) | AuthError::Signing(_) | AuthError::Hashing(_) => {
                ErrorClass::TransientBackend
            }
        }
    }

    /// True when the revocation store failed
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, AuthError::Store(_))
    }
}
