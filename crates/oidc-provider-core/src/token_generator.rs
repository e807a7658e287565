//! Opaque token value generation.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;

/// Number of random bytes behind every token, code and request key.
pub const DEFAULT_TOKEN_SIZE: usize = 32;

/// Produces opaque random token strings.
///
/// Implementations must be safe for concurrent use without external locking.
pub trait TokenGenerator: Send + Sync {
    /// Returns `size` random bytes encoded as base64url without padding.
    fn generate(&self, size: usize) -> String;
}

/// Token generator backed by the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureTokenGenerator;

impl TokenGenerator for SecureTokenGenerator {
    fn generate(&self, size: usize) -> String {
        let mut bytes = vec![0u8; size];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(&bytes)
    }
}

/// Compares two secrets without short-circuiting on the first differing
/// byte. Only the length leaks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
