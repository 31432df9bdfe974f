//! Bearer token extraction and the authenticated-user extractor.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Query},
    http::{
        HeaderMap,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use serde::Deserialize;

use crate::domain::UserId;

use super::{error::ApiError, state::AppState};

const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Find the session token: `Authorization: Bearer`, then `?token=`, then the
/// `token` cookie. Blank values are skipped.
pub fn extract_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim());

    let from_cookie = || {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == TOKEN_COOKIE)
            .map(|(_, value)| value.trim())
    };

    from_header
        .filter(|token| !token.is_empty())
        .or_else(|| query_token.map(str::trim).filter(|token| !token.is_empty()))
        .or_else(|| from_cookie().filter(|token| !token.is_empty()))
        .map(str::to_string)
}

/// The caller of an authenticated route, with the token it presented.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let query_token = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.token);

        let Some(token) = extract_token(&parts.headers, query_token.as_deref()) else {
            tracing::warn!("request to {} without token", parts.uri.path());
            return Err(ApiError::unauthorized("missing token"));
        };

        match state.tokens.validate(&token).await {
            Ok(user_id) => Ok(Self { user_id, token }),
            Err(e) => {
                tracing::warn!("token validation failed: {}", e);
                Err(ApiError::from(e))
            }
        }
    }
}
