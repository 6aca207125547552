//! Truncated hash-based commitment.

use sha2::{Digest, Sha256};

/// Hash-based commitment over opaque byte strings.
///
/// The committed message is expected to carry its own hiding randomness
/// (e.g. a key ‖ padding blob); the commitment is a truncated SHA-256
/// digest of the whole message.
pub struct Commitment;

impl Commitment {
    /// Commits to `msg`, returning a `len`-byte digest.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the SHA-256 digest length of 32 bytes.
    pub fn commit(msg: &[u8], len: usize) -> Vec<u8> {
        assert!(len <= 32, "commitment is at most 32 bytes");
        let mut hasher = Sha256::new();
        hasher.update(msg);
        hasher.finalize()[..len].to_vec()
    }

    /// Opens `com` against `msg`.
    pub fn check(msg: &[u8], com: &[u8]) -> bool {
        Self::commit(msg, com.len()) == com
    }
}
