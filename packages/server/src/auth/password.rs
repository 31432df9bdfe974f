//! Argon2 password hashing for the account store.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::RngCore;

use super::AuthError;

/// Hash a password into a PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hashing(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a password against a stored PHC string. Unparseable hashes never match.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        tracing::warn!("stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        // テスト項目: ハッシュ化したパスワードを検証できる
        // given (前提条件):
        let hash = hash_password("correct horse").unwrap();

        // when (操作) / then (期待する結果):
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        // テスト項目: 同じパスワードでもソルトによりハッシュが異なる
        // given (前提条件):
        let first = hash_password("password").unwrap();

        // when (操作):
        let second = hash_password("password").unwrap();

        // then (期待する結果):
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        // テスト項目: 不正なハッシュ文字列は常に不一致になる
        // given (前提条件):
        let garbage = "not-a-phc-string";

        // when (操作) / then (期待する結果):
        assert!(!verify_password("password", garbage));
    }
}
