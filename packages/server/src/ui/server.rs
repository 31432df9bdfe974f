//! Server execution logic.

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::Request,
    middleware,
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::{
    handler::{
        create_chat, delete_chat, get_chat_messages, get_chats, health_check, login, logout,
        prometheus_metrics, register, verification_status, verification_token, verify_email,
        websocket_handler,
    },
    middleware::{MakeRequestUuidV4, REQUEST_ID_HEADER, rate_limit, track_metrics},
    signal::shutdown_signal,
    state::AppState,
};

/// Chat server: HTTP API and WebSocket endpoint on one listener
///
/// # Example
///
/// ```ignore
/// let server = Server::new(Arc::new(app_state));
/// server.run("127.0.0.1", 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Build the router with every route and layer attached.
    ///
    /// Layer order, outermost first: request id, response id propagation,
    /// tracing, request metrics, then the `/api` rate limit. `/metrics` sits
    /// outside `/api` and is neither limited nor counted.
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/health", get(health_check))
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/auth/logout", post(logout))
            .route("/auth/verify-email", get(verify_email))
            .route("/auth/verification-token", get(verification_token))
            .route("/auth/verification-status", get(verification_status))
            .route("/chats", post(create_chat).get(get_chats))
            .route("/chats/{chat_id}", delete(delete_chat))
            .route("/chats/{chat_id}/messages", get(get_chat_messages))
            .route("/ws", get(websocket_handler))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                rate_limit,
            ))
            .route_layer(middleware::from_fn(track_metrics));

        Router::new()
            .route("/metrics", get(prometheus_metrics))
            .nest("/api", api)
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(&REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
            .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuidV4))
    }

    /// Run the chat server until Ctrl+C / SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: &str, port: u16) -> std::io::Result<()> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("chat server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/api/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves, then stop the hub.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        if let Err(e) = self.state.hub.shutdown().await {
            tracing::warn!("hub already stopped: {}", e);
        }
        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
