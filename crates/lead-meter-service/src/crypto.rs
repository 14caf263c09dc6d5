//! Cryptographic helpers for request authentication.
//!
//! Stripe signs `"<timestamp>.<raw body>"` with HMAC-SHA256; the body must be
//! hashed exactly as received, so these helpers work on bytes.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 over the concatenation of `parts` and hex-encode it.
///
/// # Panics
///
/// This function will never panic in practice. The `expect` call is guarded by
/// the invariant that HMAC-SHA256 accepts keys of any size per RFC 2104.
#[must_use]
pub fn hmac_sha256_hex(secret: &str, parts: &[&[u8]]) -> String {
    // INVARIANT: HMAC-SHA256 accepts keys of any size per RFC 2104.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    for part in parts {
        mac.update(part);
    }

    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison.
///
/// Used for every secret comparison: shared tokens and signatures.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
