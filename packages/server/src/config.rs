//! Server configuration: command-line flags with environment fallbacks.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::{
    auth::token::DEFAULT_TOKEN_TTL,
    hub::{DEFAULT_COMMAND_CAPACITY, DEFAULT_OUTBOX_CAPACITY, HubConfig},
};

pub const DEFAULT_JWT_SECRET: &str = "your_default_secret_change_in_production";
pub const DEFAULT_RATE_LIMIT_MAX: usize = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";

#[derive(Parser, Debug, Clone)]
#[command(name = "hiroba-server")]
#[command(about = "Real-time group chat server over WebSocket", long_about = None)]
pub struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HIROBA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "HIROBA_PORT", default_value_t = 8080)]
    pub port: u16,

    /// HMAC secret used to sign session tokens
    #[arg(long, env = "HIROBA_JWT_SECRET", default_value = DEFAULT_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: String,

    /// Session token lifetime in seconds
    #[arg(long, env = "HIROBA_TOKEN_TTL_SECS", default_value_t = DEFAULT_TOKEN_TTL.as_secs())]
    pub token_ttl_secs: u64,

    /// Requests allowed per client within one rate-limit window
    #[arg(long, env = "HIROBA_RATE_LIMIT_MAX", default_value_t = DEFAULT_RATE_LIMIT_MAX)]
    pub rate_limit_max: usize,

    /// Rate-limit window length in seconds
    #[arg(long, env = "HIROBA_RATE_LIMIT_WINDOW_SECS", default_value_t = DEFAULT_RATE_LIMIT_WINDOW.as_secs())]
    pub rate_limit_window_secs: u64,

    /// Outbound queue bound per connection; a client that falls this far behind is dropped
    #[arg(long, env = "HIROBA_OUTBOX_CAPACITY", default_value_t = DEFAULT_OUTBOX_CAPACITY)]
    pub outbox_capacity: usize,

    /// Bound of the hub's command channel
    #[arg(long, env = "HIROBA_HUB_COMMAND_CAPACITY", default_value_t = DEFAULT_COMMAND_CAPACITY)]
    pub hub_command_capacity: usize,

    /// Do not deliver a chat message back to its sender
    #[arg(long, env = "HIROBA_NO_ECHO")]
    pub no_echo: bool,

    /// Create demo users and chats on startup
    #[arg(long, env = "HIROBA_SEED_DEMO")]
    pub seed_demo: bool,

    /// Externally reachable base URL, used in email verification links
    #[arg(long, env = "HIROBA_PUBLIC_URL", default_value = DEFAULT_PUBLIC_URL)]
    pub public_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("jwt secret must not be empty")]
    EmptySecret,

    #[error("public url must start with http:// or https://: {0}")]
    PublicUrl(String),
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub rate_limit_max: usize,
    pub rate_limit_window: Duration,
    pub outbox_capacity: usize,
    pub hub: HubConfig,
    pub seed_demo: bool,
    pub public_url: String,
}

impl ServerConfig {
    /// True while the built-in development secret is in use
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl: DEFAULT_TOKEN_TTL,
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            hub: HubConfig::default(),
            seed_demo: false,
            public_url: DEFAULT_PUBLIC_URL.to_string(),
        }
    }
}

fn non_zero<T: PartialEq + Default>(value: T, name: &'static str) -> Result<T, ConfigError> {
    if value == T::default() {
        Err(ConfigError::Zero { name })
    } else {
        Ok(value)
    }
}

impl TryFrom<Args> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.jwt_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if !(args.public_url.starts_with("http://") || args.public_url.starts_with("https://")) {
            return Err(ConfigError::PublicUrl(args.public_url));
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            jwt_secret: args.jwt_secret,
            token_ttl: Duration::from_secs(non_zero(args.token_ttl_secs, "token ttl")?),
            rate_limit_max: non_zero(args.rate_limit_max, "rate limit max")?,
            rate_limit_window: Duration::from_secs(non_zero(
                args.rate_limit_window_secs,
                "rate limit window",
            )?),
            outbox_capacity: non_zero(args.outbox_capacity, "outbox capacity")?,
            hub: HubConfig {
                command_capacity: non_zero(args.hub_command_capacity, "hub command capacity")?,
                echo_to_sender: !args.no_echo,
            },
            seed_demo: args.seed_demo,
            public_url: args.public_url.trim_end_matches('/').to_string(),
        })
    }
}
