//! Shared application state.

use std::sync::Arc;

use hiroba_shared::time::Clock;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::{
    auth::{SlidingWindowLimiter, TokenAuthority},
    config::ServerConfig,
    domain::{
        ChatRepository, EmailSender, MessageHub, MessageRepository, RevocationStore,
        UserRepository,
    },
    hub::HubHandle,
    infrastructure::{
        email::LogEmailSender,
        repository::{
            InMemoryChatRepository, InMemoryMessageRepository, InMemoryRevocationStore,
            InMemoryUserRepository,
        },
    },
    telemetry,
    usecase::{
        CreateChatUseCase, DeleteChatUseCase, GetChatsUseCase, GetMessagesUseCase,
        JoinChatUseCase, LoginUseCase, LogoutUseCase, RegisterUserUseCase, SendMessageUseCase,
        VerifyEmailUseCase,
    },
};

/// Persistence adapters the use cases are built on
#[derive(Clone)]
pub struct Repositories {
    pub chats: Arc<dyn ChatRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub users: Arc<dyn UserRepository>,
    pub revocations: Arc<dyn RevocationStore>,
}

impl Repositories {
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            chats: Arc::new(InMemoryChatRepository::new()),
            messages: Arc::new(InMemoryMessageRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
            revocations: Arc::new(InMemoryRevocationStore::new(clock)),
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Session token authority (issue / validate / revoke)
    pub tokens: Arc<TokenAuthority>,
    /// Per-client admission gate for `/api`
    pub limiter: Arc<SlidingWindowLimiter>,
    /// Front door of the connection hub
    pub hub: HubHandle,
    /// Bound of each connection's outbound queue
    pub outbox_capacity: usize,
    /// Renders the Prometheus scrape page
    pub metrics: PrometheusHandle,

    pub register_user_usecase: Arc<RegisterUserUseCase>,
    pub login_usecase: Arc<LoginUseCase>,
    pub logout_usecase: Arc<LogoutUseCase>,
    pub verify_email_usecase: Arc<VerifyEmailUseCase>,
    pub create_chat_usecase: Arc<CreateChatUseCase>,
    pub delete_chat_usecase: Arc<DeleteChatUseCase>,
    pub get_chats_usecase: Arc<GetChatsUseCase>,
    pub get_messages_usecase: Arc<GetMessagesUseCase>,
    pub join_chat_usecase: Arc<JoinChatUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
}

impl AppState {
    /// Wire every use case on top of `repositories` and the running hub.
    ///
    /// Verification mail goes to the log through [`LogEmailSender`].
    pub fn new(
        config: &ServerConfig,
        repositories: Repositories,
        hub: HubHandle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let Repositories {
            chats,
            messages,
            users,
            revocations,
        } = repositories;

        let tokens = Arc::new(TokenAuthority::new(
            config.jwt_secret.as_bytes(),
            config.token_ttl,
            revocations,
            clock.clone(),
        ));
        let limiter = Arc::new(SlidingWindowLimiter::new(
            config.rate_limit_max,
            config.rate_limit_window,
            clock.clone(),
        ));
        let message_hub: Arc<dyn MessageHub> = Arc::new(hub.clone());
        let email_sender: Arc<dyn EmailSender> = Arc::new(LogEmailSender::new());

        Self {
            register_user_usecase: Arc::new(RegisterUserUseCase::new(
                users.clone(),
                email_sender,
                clock.clone(),
                config.public_url.clone(),
            )),
            login_usecase: Arc::new(LoginUseCase::new(users.clone(), tokens.clone())),
            logout_usecase: Arc::new(LogoutUseCase::new(tokens.clone(), message_hub.clone())),
            verify_email_usecase: Arc::new(VerifyEmailUseCase::new(users.clone())),
            create_chat_usecase: Arc::new(CreateChatUseCase::new(
                chats.clone(),
                users,
                message_hub.clone(),
                clock.clone(),
            )),
            delete_chat_usecase: Arc::new(DeleteChatUseCase::new(
                chats.clone(),
                messages.clone(),
                message_hub.clone(),
                clock.clone(),
            )),
            get_chats_usecase: Arc::new(GetChatsUseCase::new(chats.clone())),
            get_messages_usecase: Arc::new(GetMessagesUseCase::new(
                chats.clone(),
                messages.clone(),
            )),
            join_chat_usecase: Arc::new(JoinChatUseCase::new(chats.clone(), message_hub.clone())),
            send_message_usecase: Arc::new(SendMessageUseCase::new(
                chats,
                messages,
                message_hub,
                clock,
            )),
            tokens,
            limiter,
            hub,
            outbox_capacity: config.outbox_capacity,
            metrics: telemetry::install_recorder(),
        }
    }
}
