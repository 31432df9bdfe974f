//! Hiroba chat server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000 --seed-demo
//! ```

use std::sync::Arc;

use clap::Parser;
use hiroba_server::{
    config::{Args, ServerConfig},
    hub::Hub,
    seed::seed_demo,
    ui::{AppState, Repositories, Server},
};
use hiroba_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(&[env!("CARGO_BIN_NAME"), "tower_http"], "debug");

    let config = match ServerConfig::try_from(Args::parse()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    if config.uses_default_secret() {
        tracing::warn!("using the default JWT secret; set HIROBA_JWT_SECRET in production");
    }

    // Initialize dependencies in order:
    // 1. Clock and repositories
    // 2. Hub event loop
    // 3. AppState (token authority, rate limiter, use cases)
    // 4. Background sweep of the rate limiter
    // 5. Server
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repositories = Repositories::in_memory(clock.clone());

    let (hub, hub_task) = Hub::spawn(config.hub.clone());

    let state = Arc::new(AppState::new(&config, repositories, hub, clock));

    if config.seed_demo {
        if let Err(e) = seed_demo(&state).await {
            tracing::error!("failed to seed demo data: {}", e);
        }
    }

    let limiter = state.limiter.clone();
    let sweep_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(limiter.window());
        loop {
            interval.tick().await;
            let removed = limiter.sweep();
            if removed > 0 {
                tracing::debug!("rate limiter sweep removed {} idle client(s)", removed);
            }
        }
    });

    let server = Server::new(state);
    if let Err(e) = server.run(&config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    sweep_task.abort();
    if let Err(e) = hub_task.await {
        tracing::warn!("hub task ended abnormally: {}", e);
    }
}
