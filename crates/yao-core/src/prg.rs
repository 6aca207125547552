//! Seedable AES-CTR PRG.

use rand::Rng;
use rand_core::{
    block::{BlockRng, BlockRngCore},
    CryptoRng, RngCore, SeedableRng,
};

use crate::{aes::AesEncryptor, Block};

/// PRG core: encrypts a counter stream under the seed key.
#[derive(Clone)]
struct PrgCore {
    aes: AesEncryptor,
    counter: u64,
}

impl BlockRngCore for PrgCore {
    type Item = u32;
    type Results = [u32; 4 * AesEncryptor::AES_BLOCK_COUNT];

    #[inline(always)]
    fn generate(&mut self, results: &mut Self::Results) {
        let mut states = [0u8; AesEncryptor::AES_BLOCK_COUNT].map(
            #[inline(always)]
            |_| {
                let counter = self.counter;
                self.counter += 1;

                let mut block = [0u8; 16];
                block[..8].copy_from_slice(&counter.to_le_bytes());

                Block::from_bytes(block)
            },
        );
        self.aes.encrypt_many_blocks(&mut states);
        *results = bytemuck::cast(states);
    }
}

impl SeedableRng for PrgCore {
    type Seed = Block;

    #[inline(always)]
    fn from_seed(seed: Self::Seed) -> Self {
        Self {
            aes: AesEncryptor::new(seed),
            counter: 0,
        }
    }
}

impl CryptoRng for PrgCore {}

/// AES-based PRG.
///
/// AES-128 in counter mode keyed with the seed. Deterministic: the same
/// seed yields the same stream, and the stream is never reseeded.
#[derive(Clone)]
pub struct Prg(BlockRng<PrgCore>);

opaque_debug::implement!(Prg);

impl RngCore for Prg {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    #[inline(always)]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }

    #[inline(always)]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.0.try_fill_bytes(dest)
    }
}

impl SeedableRng for Prg {
    type Seed = Block;

    #[inline(always)]
    fn from_seed(seed: Self::Seed) -> Self {
        Prg(BlockRng::<PrgCore>::from_seed(seed))
    }

    #[inline(always)]
    fn from_rng<R: RngCore>(rng: R) -> Result<Self, rand_core::Error> {
        BlockRng::<PrgCore>::from_rng(rng).map(Prg)
    }
}

impl CryptoRng for Prg {}

impl Prg {
    /// New Prg with a random seed.
    #[inline(always)]
    pub fn new() -> Self {
        Prg::from_seed(rand::random::<Block>())
    }

    /// Returns `nbits` random bits packed into ⌈nbits/8⌉ bytes.
    ///
    /// Trailing bits of the last byte are zero.
    pub fn random_bits(&mut self, nbits: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; (nbits + 7) / 8];
        self.fill_bytes(&mut bytes);
        let rem = nbits % 8;
        if rem != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= (1u8 << rem) - 1;
            }
        }
        bytes
    }

    /// Generate a random block.
    #[inline(always)]
    pub fn random_block(&mut self) -> Block {
        self.gen()
    }

    /// Fill a byte slice with random values.
    #[inline(always)]
    pub fn random_bytes(&mut self, buf: &mut [u8]) {
        self.fill_bytes(buf);
    }
}

impl Default for Prg {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}
