//! Session token authority.
//!
//! Tokens are HS256 JWTs carrying `{username, exp}`. They are stateless; logout
//! works through a side store of revoked token fingerprints whose entries never
//! outlive the token itself.

use std::{sync::Arc, time::Duration};

use hiroba_shared::time::Clock;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{RevocationStore, UserId};

use super::AuthError;

/// Default token lifetime
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Only algorithm accepted on validation, whatever the token header claims.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims embedded in a session token.
///
/// Both fields are optional on decode so that a missing claim surfaces as
/// `AuthError::MissingClaim` rather than a generic decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Expiry, Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// A freshly issued token and its expiry (Unix seconds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Stable revocation-store key for a token: hex SHA-256 of the raw token.
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    revocations: Arc<dyn RevocationStore>,
    clock: Arc<dyn Clock>,
}

impl TokenAuthority {
    pub fn new(
        secret: &[u8],
        ttl: Duration,
        revocations: Arc<dyn RevocationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
            revocations,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a signed token for `subject`, expiring `ttl` from now.
    pub fn issue(&self, subject: &UserId) -> Result<IssuedToken, AuthError> {
        let expires_at = self.clock.now_secs() + self.ttl.as_secs() as i64;
        let claims = SessionClaims {
            username: Some(subject.as_str().to_string()),
            exp: Some(expires_at),
        };

        let token = encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        tracing::debug!("issued token for '{}' (exp {})", subject, expires_at);
        Ok(IssuedToken { token, expires_at })
    }

    /// Validate `token` and return its subject.
    ///
    /// Steps fail fast in order: empty, revoked, algorithm/signature,
    /// expiry, subject.
    pub async fn validate(&self, token: &str) -> Result<UserId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        let token_hash = fingerprint(token);
        let revoked = self.revocations.is_revoked(&token_hash).await.map_err(|e| {
            tracing::error!("token revocation check failed: {}", e);
            AuthError::Store(e.to_string())
        })?;
        if revoked {
            return Err(AuthError::Revoked);
        }

        let claims = self.decode_verified(token)?;

        let exp = claims.exp.ok_or(AuthError::MissingClaim("exp"))?;
        if self.clock.now_secs() > exp {
            return Err(AuthError::Expired);
        }

        let username = claims
            .username
            .filter(|name| !name.is_empty())
            .ok_or(AuthError::MissingClaim("username"))?;
        let subject = UserId::new(username)
            .map_err(|e| AuthError::Malformed(format!("invalid username claim: {}", e)))?;

        tracing::debug!("token validated for '{}'", subject);
        Ok(subject)
    }

    /// Revoke `token` for at most `ttl`.
    ///
    /// The stored TTL is clamped to the token's remaining lifetime so the
    /// revocation list cannot grow past live tokens; an already expired token
    /// is not stored at all.
    pub async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        let remaining = self.remaining_lifetime(token)?;
        if remaining.is_zero() {
            tracing::debug!("token already expired; skipping revocation");
            return Ok(());
        }

        let effective_ttl = ttl.min(remaining);
        self.revocations
            .revoke(fingerprint(token), effective_ttl)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        tracing::info!("token revoked for {:?}", effective_ttl);
        Ok(())
    }

    /// Time until `token` stops validating. Zero when already expired.
    ///
    /// The signature is verified; expiry is not enforced.
    pub fn remaining_lifetime(&self, token: &str) -> Result<Duration, AuthError> {
        let claims = self.decode_verified(token)?;
        let exp = claims.exp.ok_or(AuthError::MissingClaim("exp"))?;

        // valid while now_secs <= exp, i.e. until the start of second exp + 1
        let valid_until_millis = exp.saturating_add(1).saturating_mul(1000);
        let remaining_millis = valid_until_millis - self.clock.now_millis();
        Ok(Duration::from_millis(remaining_millis.max(0) as u64))
    }

    fn decode_verified(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::Malformed(format!("invalid token header: {}", e)))?;
        if header.alg != SIGNING_ALGORITHM {
            tracing::warn!("rejected token signed with {:?}", header.alg);
            return Err(AuthError::Malformed(format!(
                "unexpected signing method {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        // expiry is checked against the injected clock instead
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::Malformed(format!("token decode error: {}", e)),
            })
    }
}
