//! Account endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::header::SET_COOKIE,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::ui::{error::ApiError, extractor::AuthenticatedUser, state::AppState};

use super::http::json_body;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    #[serde(default)]
    pub username: String,
}

/// Create an unverified account and send its verification link.
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(body)?;
    let user_id = state
        .register_user_usecase
        .execute(&request.username, &request.password, &request.email)
        .await?;

    Ok(Json(json!({
        "message": "User registered successfully. Please check your email to verify your account",
        "username": user_id,
    })))
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = state.verify_email_usecase.verify(&query.token).await?;

    Ok(Json(json!({
        "message": "Email verified successfully",
        "username": user_id,
    })))
}

/// Pending verification token of a user; `null` once verified.
pub async fn verification_token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state
        .verify_email_usecase
        .token_for(&query.username)
        .await?;

    Ok(Json(json!({
        "username": query.username.trim(),
        "token": token,
    })))
}

pub async fn verification_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let verified = state
        .verify_email_usecase
        .status_of(&query.username)
        .await?;

    Ok(Json(json!({
        "username": query.username.trim(),
        "verified": verified,
    })))
}

/// Issue a token, returned in the body and as the `token` cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(body)?;
    let issued = state
        .login_usecase
        .execute(&request.username, &request.password)
        .await?;

    let cookie = format!(
        "token={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        issued.token,
        state.tokens.ttl().as_secs()
    );
    Ok((
        [(SET_COOKIE, cookie)],
        Json(json!({
            "token": issued.token,
            "expires_at": issued.expires_at,
        })),
    ))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    state
        .logout_usecase
        .execute(&user.user_id, &user.token)
        .await?;

    Ok((
        [(SET_COOKIE, "token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0".to_string())],
        Json(json!({"message": "Logged out"})),
    ))
}
