//! # Keccak256 hashing
//!
//! Every commitment in the node (tx digests, trie node hashes, node ids) uses
//! Keccak256 so that wire-level digests match across the signature, trie and
//! P2P layers without a second hash function in play.

use sha3::{Digest, Keccak256};

/// Keccak256 hash output.
pub type Hash = [u8; 32];

/// Stateful Keccak256 hasher, for incremental digests over RLP-like streams.
pub struct Keccak256Hasher {
    inner: Keccak256,
}

impl Keccak256Hasher {
    /// Create a new hasher.
    pub fn new() -> Self {
        Self {
            inner: Keccak256::new(),
        }
    }

    /// Feed more bytes into the digest.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Consume the hasher and return the digest.
    pub fn finalize(self) -> Hash {
        let result = self.inner.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        hash
    }
}

impl Default for Keccak256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot Keccak256 over a single buffer.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Keccak256 over the concatenation of several buffers, without allocating
/// an intermediate `Vec` — used for the tx signing digest and trie node hashes.
pub fn keccak256_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256Hasher::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_32_bytes() {
        let hash = keccak256(b"hello");
        assert_eq!(hash.len(), 32);
    }

    #[test]
    fn deterministic() {
        assert_eq!(keccak256(b"test"), keccak256(b"test"));
    }

    #[test]
    fn distinct_inputs_differ() {
        assert_ne!(keccak256(b"a"), keccak256(b"b"));
    }

    #[test]
    fn streaming_matches_many() {
        let a = keccak256_many(&[b"hello ", b"world"]);
        let b = keccak256(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn known_vector_empty_string() {
        // keccak256("") — not SHA3-256("") — a well-known constant used to
        // catch accidental substitution of the NIST SHA3 variant.
        let hash = keccak256(b"");
        assert_eq!(
            hex::encode(hash),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a47"
        );
    }
}
