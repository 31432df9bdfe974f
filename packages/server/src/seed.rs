//! Demo accounts and chats for local development.

use thiserror::Error;

use crate::{
    domain::UserId,
    ui::AppState,
    usecase::{AccountError, ChatError},
};

pub const DEMO_USERS: [&str; 3] = ["user1", "user2", "user3"];
pub const DEMO_PASSWORD: &str = "password";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to create demo user: {0}")]
    Account(#[from] AccountError),

    #[error("failed to create demo chat: {0}")]
    Chat(#[from] ChatError),
}

/// Create verified `user1..user3` and two chats owned by `user1`.
///
/// Users that already exist are left as they are.
pub async fn seed_demo(state: &AppState) -> Result<(), SeedError> {
    for name in DEMO_USERS {
        let email = format!("{}@example.com", name);
        match state
            .register_user_usecase
            .execute(name, DEMO_PASSWORD, &email)
            .await
        {
            Ok(_) | Err(AccountError::UsernameTaken) => {}
            Err(e) => return Err(e.into()),
        }
        if let Some(token) = state.verify_email_usecase.token_for(name).await? {
            state.verify_email_usecase.verify(&token).await?;
        }
    }

    let user = |name: &str| {
        UserId::new(name.to_string()).map_err(|e| AccountError::InvalidInput(e.to_string()))
    };
    let chats = [
        ("General Chat", "user2"),
        ("Random Chat", "user3"),
    ];
    for (chat_name, member) in chats {
        let chat = state
            .create_chat_usecase
            .execute(user("user1")?, chat_name.to_string(), vec![user(member)?])
            .await?;
        tracing::info!("demo chat {} '{}' created", chat.id, chat.name);
    }

    Ok(())
}
