//! HTTP error responses.
//!
//! Every failure is answered as `{"error": "..."}` with a status derived from
//! the error class.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    auth::AuthError,
    domain::ErrorClass,
    telemetry,
    usecase::{AccountError, ChatError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn too_many_requests() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "Too many requests")
    }

    /// Status for a class, with backend details kept out of the body
    fn from_class(class: ErrorClass, message: String) -> Self {
        match class {
            ErrorClass::Validation => Self::bad_request(message),
            ErrorClass::Authorization => Self::unauthorized(message),
            ErrorClass::ResourceExhausted => Self::new(StatusCode::TOO_MANY_REQUESTS, message),
            ErrorClass::TransientBackend => {
                tracing::error!("request failed: {}", message);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(error: ChatError) -> Self {
        if error.is_storage_failure() {
            telemetry::record_database_error();
        }
        match error {
            ChatError::ChatNotFound(_) => Self::new(StatusCode::NOT_FOUND, error.to_string()),
            ChatError::NotMember(_) => Self::new(StatusCode::FORBIDDEN, error.to_string()),
            other => Self::from_class(other.class(), other.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(error: AccountError) -> Self {
        if error.is_storage_failure() {
            telemetry::record_database_error();
        }
        match error {
            AccountError::UnknownUser(_) => Self::new(StatusCode::NOT_FOUND, error.to_string()),
            other => Self::from_class(other.class(), other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        if error.is_storage_failure() {
            telemetry::record_database_error();
        }
        Self::from_class(error.class(), error.to_string())
    }
}
