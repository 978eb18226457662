//! Opaque bearer tokens.

use sha2::{Digest, Sha256};

/// Generates a random 256-bit token, hex encoded.
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// The value stored for a token: hex-encoded SHA-256.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
