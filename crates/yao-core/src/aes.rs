//! AES-128 primitives: the PRG block encryptor and the fixed-key
//! correlation-robust hashes used as the garbling KDF.

use aes::{
    cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit},
    Aes128,
};
use once_cell::sync::Lazy;

use crate::Block;

/// AES-128 encryptor keyed at construction, used by the PRG.
#[derive(Clone)]
pub struct AesEncryptor(Aes128);

opaque_debug::implement!(AesEncryptor);

impl AesEncryptor {
    /// Number of blocks encrypted per batch.
    pub const AES_BLOCK_COUNT: usize = 8;

    /// Creates a new encryptor keyed with `key`.
    #[inline]
    pub fn new(key: Block) -> Self {
        let key = GenericArray::from(key.to_bytes());
        Self(Aes128::new(&key))
    }

    /// Encrypts a single block.
    #[inline]
    pub fn encrypt_block(&self, block: Block) -> Block {
        let mut buf = GenericArray::from(block.to_bytes());
        self.0.encrypt_block(&mut buf);
        Block::from_bytes(buf.into())
    }

    /// Encrypts blocks in place.
    #[inline]
    pub fn encrypt_many_blocks<const N: usize>(&self, blocks: &mut [Block; N]) {
        for block in blocks.iter_mut() {
            *block = self.encrypt_block(*block);
        }
    }
}

/// Fixed-key AES hash with two domain-separated arities.
///
/// `tccr` is the tweakable circular correlation-robust hash of
/// [GKWY20](https://eprint.iacr.org/2019/074) §7.4, `π(π(x) ⊕ t) ⊕ π(x)`.
/// `tccr2` extends it to two keys by folding the second key in through the
/// half-swapping permutation σ. Callers truncate the 16-byte output to the
/// key width themselves.
pub struct FixedKeyAes(Aes128);

opaque_debug::implement!(FixedKeyAes);

/// The fixed-key AES instance shared by all engines.
pub static FIXED_KEY_AES: Lazy<FixedKeyAes> = Lazy::new(|| FixedKeyAes::new(Block::ZERO));

/// σ(x₀ ‖ x₁) = (x₀ ⊕ x₁) ‖ x₁.
///
/// An orthomorphism: breaks the symmetry between the two keys of `tccr2`.
#[inline]
fn sigma(x: Block) -> Block {
    let v = x.inner();
    Block::new(v.rotate_left(64) ^ (v & (u128::MAX << 64)))
}

impl FixedKeyAes {
    /// Creates a new fixed-key hash keyed with `key`.
    #[inline]
    pub fn new(key: Block) -> Self {
        let key = GenericArray::from(key.to_bytes());
        Self(Aes128::new(&key))
    }

    #[inline]
    fn pi(&self, x: Block) -> Block {
        let mut buf = GenericArray::from(x.to_bytes());
        self.0.encrypt_block(&mut buf);
        Block::from_bytes(buf.into())
    }

    /// Tweakable circular correlation-robust hash of a single key.
    #[inline]
    pub fn tccr(&self, tweak: Block, x: Block) -> Block {
        let pi_x = self.pi(x);
        self.pi(pi_x ^ tweak) ^ pi_x
    }

    /// Tweakable circular correlation-robust hash of a key pair.
    #[inline]
    pub fn tccr2(&self, tweak: Block, x: Block, y: Block) -> Block {
        self.tccr(tweak, x ^ sigma(y))
    }
}
