//! 128-bit block type used to carry wire labels and KDF inputs.

use std::ops::{BitAnd, BitXor, BitXorAssign};

use bytemuck::{Pod, Zeroable};
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};

/// A 128-bit value.
///
/// Wire labels, KDF tweaks, and PRG seeds are all carried as blocks. The
/// byte representation is little-endian, so the point-and-permute bit
/// (the least-significant bit) lives in byte 0.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block(u128);

impl Block {
    /// Length of a block in bytes.
    pub const LEN: usize = 16;
    /// The all-zero block.
    pub const ZERO: Self = Self(0);
    /// The all-one block.
    pub const ONES: Self = Self(u128::MAX);

    /// Creates a new block.
    #[inline]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Returns the inner value.
    #[inline]
    pub const fn inner(&self) -> u128 {
        self.0
    }

    /// Returns a block whose low `bits` bits are set.
    ///
    /// This is the clear mask for a `bits`-bit security parameter: ANDing
    /// a block against it zeroes everything above the key width.
    #[inline]
    pub const fn low_mask(bits: usize) -> Self {
        if bits >= 128 {
            Self::ONES
        } else {
            Self((1u128 << bits) - 1)
        }
    }

    /// Returns the least-significant bit.
    #[inline]
    pub const fn lsb(&self) -> usize {
        (self.0 & 1) as usize
    }

    /// Sets the least-significant bit.
    #[inline]
    pub fn set_lsb(&mut self) {
        self.0 |= 1;
    }

    /// Clears the least-significant bit.
    #[inline]
    pub fn clear_lsb(&mut self) {
        self.0 &= !1;
    }

    /// Returns the little-endian byte representation.
    #[inline]
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0.to_le_bytes()
    }

    /// Creates a block from its little-endian byte representation.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_le_bytes(bytes))
    }

    /// Creates a block from up to 16 low-order bytes, zero-extending the
    /// rest.
    ///
    /// Key material on the wire is the low ⌈k/8⌉ bytes of a block; this
    /// reverses that truncation.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is longer than 16 bytes.
    #[inline]
    pub fn from_lo_bytes(bytes: &[u8]) -> Self {
        assert!(bytes.len() <= 16, "block is at most 16 bytes");
        let mut buf = [0u8; 16];
        buf[..bytes.len()].copy_from_slice(bytes);
        Self::from_bytes(buf)
    }
}

impl From<u128> for Block {
    #[inline]
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for Block {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl From<Block> for u128 {
    #[inline]
    fn from(block: Block) -> Self {
        block.0
    }
}

impl From<[u8; 16]> for Block {
    #[inline]
    fn from(bytes: [u8; 16]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Block> for [u8; 16] {
    #[inline]
    fn from(block: Block) -> Self {
        block.to_bytes()
    }
}

impl AsRef<[u8]> for Block {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl AsMut<[u8]> for Block {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        bytemuck::bytes_of_mut(self)
    }
}

impl BitXor for Block {
    type Output = Self;

    #[inline]
    fn bitxor(self, rhs: Self) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

impl BitXorAssign for Block {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Self) {
        self.0 ^= rhs.0;
    }
}

impl BitAnd for Block {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl Distribution<Block> for Standard {
    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Block {
        Block(rng.gen())
    }
}
