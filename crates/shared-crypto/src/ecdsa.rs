//! # Recoverable ECDSA signatures (secp256k1)
//!
//! Every signed artifact in the node (transactions, paymaster co-signatures,
//! P2P handshake packets) uses a 65-byte `(r, s, v)` signature over a
//! Keccak256 digest, recoverable back to a 20-byte address the same way the
//! sender/paymaster/node identity is derived everywhere else in the system:
//! `keccak256(uncompressed_pubkey[1..])[12..]`.
//!
//! ## Security properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing).
//! - Low-S normalization is enforced on both signing and verification
//!   (EIP-2): a signature with a high `s` is rejected outright rather than
//!   silently accepted as an equally-valid malleable twin.
//! - `r`/`s` range and curve-membership are checked before recovery is
//!   attempted, so malformed signatures fail fast instead of falling through
//!   to the `k256` error path.

use crate::CryptoError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::FromEncodedPoint;
use k256::{AffinePoint, EncodedPoint};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

/// 20-byte address derived from a public key.
pub type Address = [u8; 20];

/// secp256k1 curve order `n`.
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// `n / 2`, the malleability boundary per EIP-2.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// A recoverable secp256k1 signature: `r || s || v`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secp256k1Signature {
    /// `r` component.
    pub r: [u8; 32],
    /// `s` component, always normalized low.
    pub s: [u8; 32],
    /// Recovery id, one of `{27, 28}`.
    pub v: u8,
}

impl Secp256k1Signature {
    /// Build from raw components without validating range — use
    /// [`recover_address`] or [`verify`](Secp256k1Signature::verify) to validate.
    pub fn from_parts(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    /// Serialize to the 65-byte wire form used for transactions and handshakes.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    /// Parse the 65-byte wire form.
    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Self { r, s, v: bytes[64] }
    }

    /// Recover the signer address and confirm the signature is well-formed
    /// (non-malleable, in-range, on-curve). This is the entry point transaction
    /// and handshake verification should use.
    pub fn recover(&self, message_hash: &[u8; 32]) -> Result<Address, CryptoError> {
        if !is_valid_scalar(&self.r) || !is_valid_r_coordinate(&self.r) {
            return Err(CryptoError::InvalidFormat);
        }
        if !is_valid_scalar(&self.s) {
            return Err(CryptoError::InvalidFormat);
        }
        if !is_low_s(&self.s) {
            return Err(CryptoError::MalleableSignature);
        }
        recover_address(message_hash, self)
    }

    /// [`recover`](Secp256k1Signature::recover) plus an equality check against
    /// the signer the caller expected.
    pub fn recover_expecting(
        &self,
        message_hash: &[u8; 32],
        expected: Address,
    ) -> Result<Address, CryptoError> {
        let recovered = self.recover(message_hash)?;
        if recovered != expected {
            return Err(CryptoError::SignerMismatch {
                expected,
                actual: recovered,
            });
        }
        Ok(recovered)
    }

    /// Like [`recover`](Secp256k1Signature::recover), but returns the full
    /// 32-byte `keccak256(pubkey[1..])` node identifier used by the P2P
    /// handshake instead of the 20-byte address truncation.
    pub fn recover_node_id(&self, message_hash: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
        if !is_valid_scalar(&self.r) || !is_valid_r_coordinate(&self.r) {
            return Err(CryptoError::InvalidFormat);
        }
        if !is_valid_scalar(&self.s) {
            return Err(CryptoError::InvalidFormat);
        }
        if !is_low_s(&self.s) {
            return Err(CryptoError::MalleableSignature);
        }
        let recovery_id = parse_recovery_id(self.v)?;
        let mut sig_bytes = [0u8; 64];
        sig_bytes[..32].copy_from_slice(&self.r);
        sig_bytes[32..].copy_from_slice(&self.s);
        let sig = Signature::from_slice(&sig_bytes).map_err(|_| CryptoError::InvalidFormat)?;
        sig_bytes.zeroize();
        let recovered_key = VerifyingKey::recover_from_prehash(message_hash, &sig, recovery_id)
            .map_err(|_| CryptoError::RecoveryFailed)?;
        Ok(node_id_from_verifying_key(&recovered_key))
    }
}

fn recover_address(
    message_hash: &[u8; 32],
    signature: &Secp256k1Signature,
) -> Result<Address, CryptoError> {
    let recovery_id = parse_recovery_id(signature.v)?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);
    let sig = Signature::from_slice(&sig_bytes).map_err(|_| CryptoError::InvalidFormat)?;
    sig_bytes.zeroize();

    let recovered_key = VerifyingKey::recover_from_prehash(message_hash, &sig, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;

    Ok(address_from_verifying_key(&recovered_key))
}

fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let hash = node_id_from_verifying_key(key);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// `keccak256(uncompressed_pubkey[1..])`, the node identifier a P2P handshake
/// packet claims and that its signature must recover back to.
fn node_id_from_verifying_key(key: &VerifyingKey) -> [u8; 32] {
    let encoded = key.to_encoded_point(false);
    let uncompressed = encoded.as_bytes();
    keccak256(&uncompressed[1..])
}

/// secp256k1 keypair used for signing transactions, paymaster co-signatures
/// and the P2P handshake. The secret is zeroized on drop.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate a random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    /// Restore a keypair from a 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// The address this keypair signs as.
    pub fn address(&self) -> Address {
        address_from_verifying_key(self.signing_key.verifying_key())
    }

    /// The full 32-byte node identifier this keypair's P2P handshakes claim.
    pub fn node_id(&self) -> [u8; 32] {
        node_id_from_verifying_key(self.signing_key.verifying_key())
    }

    /// Sign a prehashed digest, producing a low-S, recoverable signature.
    pub fn sign(&self, message_hash: &[u8; 32]) -> Secp256k1Signature {
        let (sig, recid) = self
            .signing_key
            .sign_prehash_recoverable(message_hash)
            .expect("signing over a 32-byte digest cannot fail");

        let sig_bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..]);

        let low_s = is_low_s(&s);
        let s_normalized = if low_s { s } else { invert_s(&s) };
        let v = if !low_s {
            // Flipping s to its low-s twin also flips which y-parity it recovers to.
            if recid.to_byte() == 0 {
                28
            } else {
                27
            }
        } else {
            recid.to_byte() + 27
        };

        Secp256k1Signature {
            r,
            s: s_normalized,
            v,
        }
    }

    /// Export the secret key bytes, for persistence under the node's key store.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl Drop for Secp256k1KeyPair {
    fn drop(&mut self) {
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

fn is_low_s(s: &[u8; 32]) -> bool {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);
    for i in 0..32 {
        let not_decided = !(less | greater);
        less |= not_decided & Choice::from((s[i] < SECP256K1_HALF_ORDER[i]) as u8);
        greater |= not_decided & Choice::from((s[i] > SECP256K1_HALF_ORDER[i]) as u8);
    }
    less.into()
}

fn is_valid_scalar(scalar: &[u8; 32]) -> bool {
    let mut is_zero = Choice::from(1u8);
    for &byte in scalar {
        is_zero &= byte.ct_eq(&0u8);
    }
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);
    for i in 0..32 {
        let not_decided = !(less | greater);
        less |= not_decided & Choice::from((scalar[i] < SECP256K1_ORDER[i]) as u8);
        greater |= not_decided & Choice::from((scalar[i] > SECP256K1_ORDER[i]) as u8);
    }
    (!is_zero & less).into()
}

fn is_valid_r_coordinate(r: &[u8; 32]) -> bool {
    let mut compressed = [0u8; 33];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(r);
    let encoded = match EncodedPoint::from_bytes(compressed) {
        Ok(e) => e,
        Err(_) => return false,
    };
    AffinePoint::from_encoded_point(&encoded).is_some().into()
}

fn parse_recovery_id(v: u8) -> Result<RecoveryId, CryptoError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(CryptoError::InvalidRecoveryId(v)),
    };
    RecoveryId::try_from(id).map_err(|_| CryptoError::InvalidRecoveryId(v))
}

/// `n - s`, used to normalize a high-S signature into its low-S twin.
fn invert_s(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;
    for i in (0..32).rev() {
        let diff = SECP256K1_ORDER[i] as i32 - s[i] as i32 - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_recover_roundtrips() {
        let keypair = Secp256k1KeyPair::generate();
        let hash = keccak256(b"hello secp256k1");
        let sig = keypair.sign(&hash);
        assert_eq!(sig.recover(&hash).unwrap(), keypair.address());
    }

    #[test]
    fn signatures_are_deterministic() {
        let keypair = Secp256k1KeyPair::from_bytes([0xAB; 32]).unwrap();
        let hash = keccak256(b"deterministic");
        assert_eq!(keypair.sign(&hash), keypair.sign(&hash));
    }

    #[test]
    fn signatures_are_always_low_s() {
        let keypair = Secp256k1KeyPair::generate();
        for msg in [b"a".as_slice(), b"b", b"c", b"longer message here"] {
            let hash = keccak256(msg);
            assert!(is_low_s(&keypair.sign(&hash).s));
        }
    }

    #[test]
    fn high_s_signature_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        let hash = keccak256(b"malleate me");
        let sig = keypair.sign(&hash);
        let malleable = Secp256k1Signature {
            r: sig.r,
            s: invert_s(&sig.s),
            v: if sig.v == 27 { 28 } else { 27 },
        };
        assert_eq!(
            malleable.recover(&hash),
            Err(CryptoError::MalleableSignature)
        );
    }

    #[test]
    fn zero_r_rejected() {
        let sig = Secp256k1Signature {
            r: [0u8; 32],
            s: [1u8; 32],
            v: 27,
        };
        assert_eq!(sig.recover(&[0u8; 32]), Err(CryptoError::InvalidFormat));
    }

    #[test]
    fn wrong_expected_signer_reported() {
        let keypair = Secp256k1KeyPair::generate();
        let hash = keccak256(b"who signed this");
        let sig = keypair.sign(&hash);
        let other = [0x42u8; 20];
        match sig.recover_expecting(&hash, other) {
            Err(CryptoError::SignerMismatch { expected, .. }) => assert_eq!(expected, other),
            other => panic!("expected SignerMismatch, got {other:?}"),
        }
    }

    #[test]
    fn invalid_recovery_id_rejected() {
        for v in [2u8, 26, 29, 255] {
            let sig = Secp256k1Signature {
                r: [1u8; 32],
                s: [1u8; 32],
                v,
            };
            assert_eq!(
                sig.recover(&[0u8; 32]),
                Err(CryptoError::InvalidRecoveryId(v))
            );
        }
    }

    #[test]
    fn node_id_recovers_from_signature() {
        let keypair = Secp256k1KeyPair::generate();
        let hash = keccak256(b"handshake payload");
        let sig = keypair.sign(&hash);
        assert_eq!(sig.recover_node_id(&hash).unwrap(), keypair.node_id());
    }

    #[test]
    fn node_id_and_address_differ_in_length_derivation() {
        let keypair = Secp256k1KeyPair::from_bytes([0x11; 32]).unwrap();
        let node_id = keypair.node_id();
        let address = keypair.address();
        assert_eq!(&node_id[12..], &address[..]);
    }

    #[test]
    fn wire_round_trip() {
        let sig = Secp256k1Signature {
            r: [7u8; 32],
            s: [9u8; 32],
            v: 28,
        };
        assert_eq!(Secp256k1Signature::from_bytes(&sig.to_bytes()), sig);
    }
}
