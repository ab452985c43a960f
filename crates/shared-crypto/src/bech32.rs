//! # Bech32 address encoding (BIP-0173)
//!
//! Addresses are 20-byte values; the human-readable prefix distinguishes the
//! two native tokens' address spaces (`nhb` for NHB-denominated accounts,
//! `znhb` for ZNHB-denominated accounts — the underlying 20 bytes are the
//! same account, only the prefix differs by context).

use crate::CryptoError;
use bech32::{FromBase32, ToBase32, Variant};

/// Human-readable part used for an address encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hrp {
    /// `nhb1...`
    Nhb,
    /// `znhb1...`
    Znhb,
}

impl Hrp {
    fn as_str(self) -> &'static str {
        match self {
            Hrp::Nhb => "nhb",
            Hrp::Znhb => "znhb",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "nhb" => Some(Hrp::Nhb),
            "znhb" => Some(Hrp::Znhb),
            _ => None,
        }
    }
}

/// Encode a 20-byte address under the given prefix.
pub fn encode(hrp: Hrp, address: &[u8; 20]) -> String {
    bech32::encode(hrp.as_str(), address.to_base32(), Variant::Bech32)
        .expect("hrp is a fixed valid ASCII string")
}

/// Decode a bech32 string, requiring it to carry the expected prefix.
pub fn decode(expected: Hrp, s: &str) -> Result<[u8; 20], CryptoError> {
    let (hrp, data, variant) =
        bech32::decode(s).map_err(|e| CryptoError::InvalidBech32(e.to_string()))?;
    if variant != Variant::Bech32 {
        return Err(CryptoError::InvalidBech32("not bech32 (bech32m?)".into()));
    }
    let parsed = Hrp::from_str(&hrp).ok_or_else(|| CryptoError::UnexpectedHrp {
        expected: expected.as_str().to_string(),
        actual: hrp.clone(),
    })?;
    if parsed != expected {
        return Err(CryptoError::UnexpectedHrp {
            expected: expected.as_str().to_string(),
            actual: hrp,
        });
    }
    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| CryptoError::InvalidBech32(e.to_string()))?;
    if bytes.len() != 20 {
        return Err(CryptoError::WrongPayloadLength(bytes.len()));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Decode without pinning an expected prefix, returning which one matched.
pub fn decode_any(s: &str) -> Result<(Hrp, [u8; 20]), CryptoError> {
    let (hrp, data, variant) =
        bech32::decode(s).map_err(|e| CryptoError::InvalidBech32(e.to_string()))?;
    if variant != Variant::Bech32 {
        return Err(CryptoError::InvalidBech32("not bech32 (bech32m?)".into()));
    }
    let parsed = Hrp::from_str(&hrp).ok_or(CryptoError::UnexpectedHrp {
        expected: "nhb|znhb".to_string(),
        actual: hrp,
    })?;
    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| CryptoError::InvalidBech32(e.to_string()))?;
    if bytes.len() != 20 {
        return Err(CryptoError::WrongPayloadLength(bytes.len()));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Ok((parsed, out))
}
