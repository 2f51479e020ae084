//! Key and user id generation.
//!
//! Both outputs are URL-safe base64 without padding so they can sit in
//! URL paths and blob keys unescaped.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// Generate a new API key string.
///
/// # Output
///
/// 22 characters encoding 16 random bytes (128 bits).
pub fn new_id() -> String {
    let bytes: [u8; 16] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Derive the storage id of a user from their OAuth subject id.
///
/// The digest is one-way, so the raw subject id never appears in a blob key,
/// and repeated logins of the same identity resolve to the same record.
pub fn user_id_for(social_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(social_id.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
