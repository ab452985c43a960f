//! Crypto error types shared by the ECDSA, hashing and bech32 modules.

use thiserror::Error;

/// Errors surfaced by `shared-crypto`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature bytes did not parse as a valid `(r, s)` pair on the curve.
    #[error("invalid signature format")]
    InvalidFormat,

    /// `v` was not one of `{0, 1, 27, 28}`.
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// `s` was not strictly below half the curve order (EIP-2 malleability check).
    #[error("malleable signature (high S value)")]
    MalleableSignature,

    /// Public key recovery from `(message_hash, signature)` failed.
    #[error("signature recovery failed")]
    RecoveryFailed,

    /// Recovered signer did not match the address the caller expected.
    #[error("signer mismatch: expected {expected:?}, got {actual:?}")]
    SignerMismatch {
        /// Address the caller expected to recover.
        expected: [u8; 20],
        /// Address actually recovered.
        actual: [u8; 20],
    },

    /// Secret key bytes were malformed.
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// Bech32 string failed to decode.
    #[error("invalid bech32 string: {0}")]
    InvalidBech32(String),

    /// Bech32 string decoded to the wrong human-readable prefix.
    #[error("unexpected bech32 hrp: expected {expected}, got {actual}")]
    UnexpectedHrp {
        /// Expected human readable part.
        expected: String,
        /// Prefix actually present.
        actual: String,
    },

    /// Decoded bech32 payload was not 20 bytes.
    #[error("bech32 payload has wrong length: {0} bytes")]
    WrongPayloadLength(usize),
}
