//! UseCase: メールアドレス確認

use std::sync::Arc;

use crate::domain::{RepositoryError, UserId, UserRepository};

use super::error::AccountError;

pub struct VerifyEmailUseCase {
    users: Arc<dyn UserRepository>,
}

impl VerifyEmailUseCase {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Mark the account owning `token` as verified and return its identity.
    pub async fn verify(&self, token: &str) -> Result<UserId, AccountError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AccountError::InvalidInput(
                "verification token is required".to_string(),
            ));
        }

        let Some(user) = self.users.get_user_by_verification_token(token).await? else {
            tracing::warn!("unknown verification token");
            return Err(AccountError::InvalidVerificationToken);
        };
        if user.email_verified {
            return Err(AccountError::AlreadyVerified);
        }

        self.users.mark_verified(&user.id).await.map_err(|e| match e {
            RepositoryError::UserNotFound(_) => AccountError::InvalidVerificationToken,
            other => AccountError::Repository(other),
        })?;
        tracing::info!("email verified: {}", user.id);
        Ok(user.id)
    }

    /// The pending verification token of `username`.
    ///
    /// Delivery is log-only, so this is how a development client finishes the
    /// flow. Verified accounts answer `None`.
    pub async fn token_for(&self, username: &str) -> Result<Option<String>, AccountError> {
        let user_id = parse_username(username)?;
        let user = self
            .users
            .get_user(&user_id)
            .await?
            .ok_or_else(|| AccountError::UnknownUser(user_id.to_string()))?;
        if user.email_verified {
            return Ok(None);
        }
        Ok(user.verification_token)
    }

    pub async fn status_of(&self, username: &str) -> Result<bool, AccountError> {
        let user_id = parse_username(username)?;
        let user = self
            .users
            .get_user(&user_id)
            .await?
            .ok_or_else(|| AccountError::UnknownUser(user_id.to_string()))?;
        Ok(user.email_verified)
    }
}

fn parse_username(username: &str) -> Result<UserId, AccountError> {
    if username.trim().is_empty() {
        return Err(AccountError::InvalidInput("username is required".to_string()));
    }
    UserId::new(username.trim().to_string()).map_err(|e| AccountError::InvalidInput(e.to_string()))
}
