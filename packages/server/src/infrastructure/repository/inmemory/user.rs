//! InMemory User Repository 実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, User, UserId, UserRepository};

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.id) {
            return Err(RepositoryError::UserAlreadyExists(user.id.into_string()));
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().await;
        Ok(users.get(user_id).cloned())
    }

    async fn get_user_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().await;
        Ok(users
            .values()
            .find(|user| user.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn mark_verified(&self, user_id: &UserId) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| RepositoryError::UserNotFound(user_id.to_string()))?;
        user.email_verified = true;
        Ok(())
    }
}
