//! Per-message symmetric encryption for `chat_message` envelopes.
//!
//! Every message gets a fresh AES-128-GCM key that travels with the ciphertext
//! from the send path to the hub. The hub opens it before fan-out, so clients
//! receive plaintext with the key still attached. This gives no confidentiality;
//! the wire shape is kept for client compatibility.

use aes_gcm::{
    Aes128Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
use thiserror::Error;

const KEY_LEN: usize = 16;
const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("message key is missing")]
    MissingKey,

    #[error("invalid base64 payload: {0}")]
    Encoding(String),

    #[error("message key must be {KEY_LEN} bytes")]
    InvalidKey,

    #[error("ciphertext too short")]
    Truncated,

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed")]
    Decrypt,

    #[error("decrypted content is not valid UTF-8")]
    NotUtf8,
}

/// Base64 ciphertext (`nonce || ciphertext`) and the base64 key that opens it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedContent {
    pub content: String,
    pub key: String,
}

/// Encrypt `plaintext` under a freshly generated key.
pub fn seal(plaintext: &str) -> Result<SealedContent, CipherError> {
    let mut key = [0u8; KEY_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut key);
    rng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes128Gcm::new_from_slice(&key).map_err(|_| CipherError::InvalidKey)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|_| CipherError::Encrypt)?;

    let mut payload = nonce_bytes.to_vec();
    payload.extend_from_slice(&ciphertext);

    Ok(SealedContent {
        content: STANDARD.encode(payload),
        key: STANDARD.encode(key),
    })
}

/// Decrypt content produced by [`seal`].
pub fn open(key: &str, content: &str) -> Result<String, CipherError> {
    let key = STANDARD
        .decode(key)
        .map_err(|e| CipherError::Encoding(e.to_string()))?;
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKey);
    }
    let payload = STANDARD
        .decode(content)
        .map_err(|e| CipherError::Encoding(e.to_string()))?;
    if payload.len() < NONCE_LEN {
        return Err(CipherError::Truncated);
    }

    let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
    let cipher = Aes128Gcm::new_from_slice(&key).map_err(|_| CipherError::InvalidKey)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CipherError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| CipherError::NotUtf8)
}
