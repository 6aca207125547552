use core::fmt;

use blake3::Hasher;
use yao_core::Hash;

use crate::DIGEST_CHUNK_SIZE;

/// Rolling digest of a garbled-circuit byte stream.
///
/// Bytes are staged in a buffer reserved at the chunk size; in chunked
/// mode the buffer is folded into the hasher whenever it grows past a
/// chunk, so the full stream never needs to be retained. The final digest
/// depends only on the concatenation of all absorbed bytes.
pub(crate) struct StreamDigest {
    hasher: Hasher,
    buffer: Vec<u8>,
    chunked: bool,
}

impl fmt::Debug for StreamDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamDigest {{ .. }}")
    }
}

impl StreamDigest {
    pub(crate) fn new(chunked: bool) -> Self {
        Self {
            hasher: Hasher::new(),
            buffer: Vec::with_capacity(DIGEST_CHUNK_SIZE),
            chunked,
        }
    }

    pub(crate) fn absorb(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        if self.chunked && self.buffer.len() > DIGEST_CHUNK_SIZE {
            self.hasher.update(&self.buffer);
            self.buffer.clear();
        }
    }

    pub(crate) fn finalize(mut self) -> Hash {
        self.hasher.update(&self.buffer);
        let digest: [u8; 32] = self.hasher.finalize().into();
        Hash::from(digest)
    }
}
