//! # Shared Crypto
//!
//! Cryptographic primitives shared by every crate that needs to sign, verify
//! or hash: secp256k1 recoverable signatures, Keccak256 hashing, and bech32
//! address encoding.
//!
//! | Module | Algorithm | Use case |
//! |--------|-----------|----------|
//! | `ecdsa` | secp256k1 (RFC 6979, recoverable) | Transaction, paymaster and P2P handshake signatures |
//! | `hashing` | Keccak256 | Tx digests, trie node hashes, node ids |
//! | `bech32` | BIP-0173 | Human-readable `nhb`/`znhb` address encoding |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bech32;
pub mod ecdsa;
pub mod errors;
pub mod hashing;

pub use ecdsa::{Address, Secp256k1KeyPair, Secp256k1Signature};
pub use errors::CryptoError;
pub use hashing::{keccak256, keccak256_many, Keccak256Hasher};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
