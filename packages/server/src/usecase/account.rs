//! UseCase: アカウント登録・ログイン・ログアウト

use std::sync::Arc;

use hiroba_shared::time::Clock;
use rand::RngCore;

use crate::{
    auth::{
        IssuedToken, TokenAuthority,
        password::{hash_password, verify_password},
    },
    domain::{EmailSender, MessageHub, RepositoryError, Timestamp, User, UserId, UserRepository},
};

use super::error::AccountError;

const VERIFICATION_TOKEN_BYTES: usize = 32;

fn parse_credentials(username: &str, password: &str) -> Result<UserId, AccountError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(AccountError::InvalidInput(
            "username and password are required".to_string(),
        ));
    }
    UserId::new(username.trim().to_string()).map_err(|e| AccountError::InvalidInput(e.to_string()))
}

fn parse_email(email: &str) -> Result<String, AccountError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AccountError::InvalidInput("email is required".to_string()));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_string()),
        _ => Err(AccountError::InvalidInput("invalid email address".to_string())),
    }
}

/// 32 random bytes, hex encoded
fn generate_verification_token() -> String {
    let mut bytes = [0u8; VERIFICATION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// ユーザー登録のユースケース
///
/// The account starts unverified; a verification link goes out through the
/// [`EmailSender`] and login is refused until it is followed.
pub struct RegisterUserUseCase {
    users: Arc<dyn UserRepository>,
    email_sender: Arc<dyn EmailSender>,
    clock: Arc<dyn Clock>,
    public_url: String,
}

impl RegisterUserUseCase {
    pub fn new(
        users: Arc<dyn UserRepository>,
        email_sender: Arc<dyn EmailSender>,
        clock: Arc<dyn Clock>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            email_sender,
            clock,
            public_url: public_url.into(),
        }
    }

    fn verification_link(&self, token: &str) -> String {
        format!(
            "{}/api/auth/verify-email?token={}",
            self.public_url.trim_end_matches('/'),
            token
        )
    }

    pub async fn execute(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<UserId, AccountError> {
        let user_id = parse_credentials(username, password)?;
        let email = parse_email(email)?;

        if self.users.get_user(&user_id).await?.is_some() {
            tracing::warn!("username already exists: {}", user_id);
            return Err(AccountError::UsernameTaken);
        }

        let password_hash = hash_password(password)?;
        let verification_token = generate_verification_token();
        self.users
            .create_user(User {
                id: user_id.clone(),
                password_hash,
                email: email.clone(),
                email_verified: false,
                verification_token: Some(verification_token.clone()),
                created_at: Timestamp::new(self.clock.now_millis()),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::UserAlreadyExists(_) => AccountError::UsernameTaken,
                other => AccountError::Repository(other),
            })?;

        // Delivery failure does not undo the registration.
        let link = self.verification_link(&verification_token);
        if let Err(e) = self.email_sender.send_verification_email(&email, &link).await {
            tracing::warn!("failed to send verification email to {}: {}", user_id, e);
        }

        tracing::info!("user registered: {}", user_id);
        Ok(user_id)
    }
}

/// ログインのユースケース
pub struct LoginUseCase {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenAuthority>,
}

impl LoginUseCase {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenAuthority>) -> Self {
        Self { users, tokens }
    }

    /// Check the credentials and issue a session token.
    ///
    /// Unknown users and wrong passwords fail the same way. An unverified
    /// account is only told so once the password matched.
    pub async fn execute(&self, username: &str, password: &str) -> Result<IssuedToken, AccountError> {
        let user_id = parse_credentials(username, password)?;

        let Some(user) = self.users.get_user(&user_id).await? else {
            tracing::warn!("login for unknown user: {}", user_id);
            return Err(AccountError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash) {
            tracing::warn!("invalid password for {}", user_id);
            return Err(AccountError::InvalidCredentials);
        }
        if !user.email_verified {
            tracing::warn!("login with unverified email: {}", user_id);
            return Err(AccountError::EmailNotVerified);
        }

        let issued = self.tokens.issue(&user.id)?;
        tracing::info!("login successful: {}", user_id);
        Ok(issued)
    }
}

/// ログアウトのユースケース
pub struct LogoutUseCase {
    tokens: Arc<TokenAuthority>,
    hub: Arc<dyn MessageHub>,
}

impl LogoutUseCase {
    pub fn new(tokens: Arc<TokenAuthority>, hub: Arc<dyn MessageHub>) -> Self {
        Self { tokens, hub }
    }

    /// Revoke `token` for whatever lifetime it has left and close the
    /// identity's live connection.
    pub async fn execute(&self, user_id: &UserId, token: &str) -> Result<(), AccountError> {
        self.tokens.revoke(token, self.tokens.ttl()).await?;
        if let Err(e) = self.hub.disconnect(user_id).await {
            tracing::warn!("failed to close connection of {} on logout: {}", user_id, e);
        }
        tracing::info!("logout: {}", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hiroba_shared::time::ManualClock;

    use super::*;
    use crate::{
        auth::{AuthError, token::DEFAULT_TOKEN_TTL},
        domain::{EmailError, HubError, MockEmailSender, MockMessageHub},
        infrastructure::repository::{InMemoryRevocationStore, InMemoryUserRepository},
    };

    struct Fixture {
        register: RegisterUserUseCase,
        login: LoginUseCase,
        logout: LogoutUseCase,
        tokens: Arc<TokenAuthority>,
        users: Arc<InMemoryUserRepository>,
    }

    fn create_fixture_with(email_sender: MockEmailSender, hub: MockMessageHub) -> Fixture {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let users = Arc::new(InMemoryUserRepository::new());
        let revocations = Arc::new(InMemoryRevocationStore::new(clock.clone()));
        let tokens = Arc::new(TokenAuthority::new(
            b"account-test-secret",
            DEFAULT_TOKEN_TTL,
            revocations,
            clock.clone(),
        ));
        Fixture {
            register: RegisterUserUseCase::new(
                users.clone(),
                Arc::new(email_sender),
                clock,
                "http://chat.example.com/",
            ),
            login: LoginUseCase::new(users.clone(), tokens.clone()),
            logout: LogoutUseCase::new(tokens.clone(), Arc::new(hub)),
            tokens,
            users,
        }
    }

    fn create_fixture() -> Fixture {
        let mut email_sender = MockEmailSender::new();
        email_sender
            .expect_send_verification_email()
            .returning(|_, _| Ok(()));
        create_fixture_with(email_sender, MockMessageHub::new())
    }

    fn user_id(name: &str) -> UserId {
        UserId::new(name.to_string()).unwrap()
    }

    async fn register_verified(fixture: &Fixture, name: &str, password: &str) {
        fixture
            .register
            .execute(name, password, &format!("{}@example.com", name))
            .await
            .unwrap();
        fixture.users.mark_verified(&user_id(name)).await.unwrap();
    }

    #[tokio::test]
    async fn test_register_then_login() {
        // テスト項目: 登録・メール確認したユーザーでログインでき、発行されたトークンが検証を通る
        // given (前提条件):
        let fixture = create_fixture();
        register_verified(&fixture, "alice", "s3cret").await;

        // when (操作):
        let issued = fixture.login.execute("alice", "s3cret").await.unwrap();

        // then (期待する結果):
        let subject = fixture.tokens.validate(&issued.token).await.unwrap();
        assert_eq!(subject.as_str(), "alice");
    }

    #[tokio::test]
    async fn test_register_sends_verification_link() {
        // テスト項目: 登録時に未確認のユーザーが作られ、確認リンクがメールで送られる
        // given (前提条件):
        let mut email_sender = MockEmailSender::new();
        email_sender
            .expect_send_verification_email()
            .withf(|email, link| {
                email == "alice@example.com"
                    && link.starts_with("http://chat.example.com/api/auth/verify-email?token=")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let fixture = create_fixture_with(email_sender, MockMessageHub::new());

        // when (操作):
        fixture
            .register
            .execute("alice", "s3cret", " alice@example.com ")
            .await
            .unwrap();

        // then (期待する結果):
        let user = fixture.users.get_user(&user_id("alice")).await.unwrap().unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(!user.email_verified);
        let token = user.verification_token.unwrap();
        assert_eq!(token.len(), VERIFICATION_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_register_survives_email_failure() {
        // テスト項目: メール送信に失敗しても登録自体は成功する
        // given (前提条件):
        let mut email_sender = MockEmailSender::new();
        email_sender
            .expect_send_verification_email()
            .times(1)
            .returning(|_, _| Err(EmailError::Delivery("smtp down".to_string())));
        let fixture = create_fixture_with(email_sender, MockMessageHub::new());

        // when (操作):
        let result = fixture
            .register
            .execute("alice", "s3cret", "alice@example.com")
            .await;

        // then (期待する結果):
        assert_eq!(result, Ok(user_id("alice")));
        assert!(fixture.users.get_user(&user_id("alice")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        // テスト項目: 同じユーザー名での再登録は失敗する
        // given (前提条件):
        let fixture = create_fixture();
        fixture
            .register
            .execute("alice", "s3cret", "alice@example.com")
            .await
            .unwrap();

        // when (操作):
        let result = fixture
            .register
            .execute("alice", "other", "other@example.com")
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(AccountError::UsernameTaken));
    }

    #[tokio::test]
    async fn test_register_requires_credentials() {
        // テスト項目: ユーザー名・パスワード・メールアドレスが不正な場合は入力エラー
        // given (前提条件):
        let fixture = create_fixture();

        // when (操作):
        let no_name = fixture.register.execute("  ", "s3cret", "a@example.com").await;
        let no_password = fixture.register.execute("alice", "", "a@example.com").await;
        let no_email = fixture.register.execute("alice", "s3cret", "").await;
        let bad_email = fixture.register.execute("alice", "s3cret", "alice.example.com").await;

        // then (期待する結果):
        assert!(matches!(no_name, Err(AccountError::InvalidInput(_))));
        assert!(matches!(no_password, Err(AccountError::InvalidInput(_))));
        assert!(matches!(no_email, Err(AccountError::InvalidInput(_))));
        assert!(matches!(bad_email, Err(AccountError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        // テスト項目: 未登録ユーザーとパスワード誤りは同じエラーになる
        // given (前提条件):
        let fixture = create_fixture();
        register_verified(&fixture, "alice", "s3cret").await;

        // when (操作):
        let wrong_password = fixture.login.execute("alice", "guess").await;
        let unknown_user = fixture.login.execute("bob", "s3cret").await;

        // then (期待する結果):
        assert_eq!(wrong_password, Err(AccountError::InvalidCredentials));
        assert_eq!(unknown_user, Err(AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_rejects_unverified_email() {
        // テスト項目: メール未確認のユーザーはログインできず、パスワード誤りは従来どおり InvalidCredentials
        // given (前提条件):
        let fixture = create_fixture();
        fixture
            .register
            .execute("alice", "s3cret", "alice@example.com")
            .await
            .unwrap();

        // when (操作):
        let unverified = fixture.login.execute("alice", "s3cret").await;
        let wrong_password = fixture.login.execute("alice", "guess").await;

        // then (期待する結果):
        assert_eq!(unverified, Err(AccountError::EmailNotVerified));
        assert_eq!(wrong_password, Err(AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_logout_revokes_token_and_disconnects() {
        // テスト項目: ログアウト後のトークンは Revoked で拒否され、ハブ上の接続が切断される
        // given (前提条件):
        let mut hub = MockMessageHub::new();
        hub.expect_disconnect()
            .withf(|user_id| user_id.as_str() == "alice")
            .times(1)
            .returning(|_| Ok(()));
        let mut email_sender = MockEmailSender::new();
        email_sender
            .expect_send_verification_email()
            .returning(|_, _| Ok(()));
        let fixture = create_fixture_with(email_sender, hub);
        register_verified(&fixture, "alice", "s3cret").await;
        let issued = fixture.login.execute("alice", "s3cret").await.unwrap();

        // when (操作):
        fixture
            .logout
            .execute(&user_id("alice"), &issued.token)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            fixture.tokens.validate(&issued.token).await,
            Err(AuthError::Revoked)
        );
    }

    #[tokio::test]
    async fn test_logout_succeeds_when_hub_is_stopped() {
        // テスト項目: ハブ停止中でもログアウト (トークン失効) は成功する
        // given (前提条件):
        let mut hub = MockMessageHub::new();
        hub.expect_disconnect()
            .times(1)
            .returning(|_| Err(HubError::Stopped));
        let mut email_sender = MockEmailSender::new();
        email_sender
            .expect_send_verification_email()
            .returning(|_, _| Ok(()));
        let fixture = create_fixture_with(email_sender, hub);
        register_verified(&fixture, "alice", "s3cret").await;
        let issued = fixture.login.execute("alice", "s3cret").await.unwrap();

        // when (操作):
        let result = fixture.logout.execute(&user_id("alice"), &issued.token).await;

        // then (期待する結果):
        assert_eq!(result, Ok(()));
        assert_eq!(
            fixture.tokens.validate(&issued.token).await,
            Err(AuthError::Revoked)
        );
    }
}
