//! Descriptor key generation for cache entries.

use sha2::{Digest, Sha256};

/// Compute the store key for a request descriptor.
///
/// Keys are SHA-256 over the uppercased method and the absolute URL, so two
/// descriptors collide exactly when they name the same resource the same
/// way.
pub fn entry_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
