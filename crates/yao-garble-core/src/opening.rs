use serde::{Deserialize, Serialize};
use yao_core::{Block, Commitment};

/// A decommitment to a generator-input wire key.
///
/// The blob is `key ‖ padding`, each half ⌈k/8⌉ bytes; the padding is
/// fresh randomness so the truncated hash of the blob is a hiding
/// commitment to the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decommitment(Vec<u8>);

impl Decommitment {
    /// Creates a decommitment to `key` with the given padding.
    ///
    /// `padding` must be `key_bytes` long.
    pub fn new(key: Block, padding: &[u8], key_bytes: usize) -> Self {
        debug_assert_eq!(padding.len(), key_bytes);
        let mut bytes = Vec::with_capacity(2 * key_bytes);
        bytes.extend_from_slice(&key.to_bytes()[..key_bytes]);
        bytes.extend_from_slice(padding);
        Self(bytes)
    }

    /// Creates a decommitment from its raw bytes, as received from the
    /// opening path.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the committed wire key.
    pub fn key(&self, key_bytes: usize) -> Block {
        Block::from_lo_bytes(&self.0[..key_bytes])
    }

    /// Returns the commitment: the blob's hash truncated to the key
    /// length.
    pub fn commit(&self) -> Vec<u8> {
        Commitment::commit(&self.0, self.0.len() / 2)
    }

    /// Returns the raw blob.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
