use sha2::{Digest, Sha256};

/// Truncated SHA-256 of the message content.
///
/// A collision only makes an unrelated message look like a duplicate, which
/// costs the user one resend, so 16 hex chars is plenty. Stable across
/// restarts and processes, unlike a hasher seeded per process.
pub fn content_fingerprint(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(&digest[..8])
}
