//! Health and metrics endpoints, and the JSON body rejection shared by the
//! API handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};

use crate::ui::{error::ApiError, state::AppState};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Prometheus scrape endpoint
pub async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], state.metrics.render())
}

/// Unwrap a JSON body, answering malformed input with a uniform 400.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::warn!("invalid input format: {}", rejection.body_text());
        ApiError::bad_request("Invalid input format")
    })
}
