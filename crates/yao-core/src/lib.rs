//! Core primitives shared by garbled-circuit protocols.
//!
//! Provides the 128-bit wire-label carrier ([`Block`]), the fixed-key AES
//! hash used as the garbling KDF ([`FixedKeyAes`]), a seedable AES-CTR
//! PRG ([`Prg`]), hash commitments, and packed-bit utilities.

#![deny(missing_docs, unreachable_pub, unused_must_use)]
#![deny(clippy::all)]

pub mod aes;
pub mod block;
pub mod commitment;
pub mod hash;
pub mod prg;
pub mod utils;

pub use aes::{AesEncryptor, FixedKeyAes, FIXED_KEY_AES};
pub use block::Block;
pub use commitment::Commitment;
pub use hash::Hash;
pub use prg::Prg;
