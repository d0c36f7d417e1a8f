//! Entry key generation.

use sha2::{Digest, Sha256};

use crate::http::RequestKey;

/// Compute the storage key for a request: SHA-256 over method and URL.
pub fn compute_cache_key(key: &RequestKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.method.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(key.url.as_bytes());
    hex::encode(hasher.finalize())
}
