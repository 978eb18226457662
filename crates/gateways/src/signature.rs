//! Payment notification signatures.

use sha2::{Digest, Sha512};

/// Computes the signature Midtrans attaches to HTTP notifications:
/// hex-encoded SHA-512 of `order_id + status_code + gross_amount + server_key`.
///
/// `gross_amount` must be the exact string from the notification body
/// (for example `"35000.00"`), not a re-formatted number.
pub fn notification_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time string comparison to prevent timing attacks.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// Checks `signature` against the expected value for the given fields.
/// Hex case is ignored.
pub(crate) fn verify(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
    signature: &str,
) -> bool {
    if server_key.is_empty() {
        return false;
    }
    let expected = notification_signature(order_id, status_code, gross_amount, server_key);
    constant_time_compare(&expected, &signature.to_ascii_lowercase())
}
