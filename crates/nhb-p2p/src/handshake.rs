//! Signed handshake packets (§4.9).
//!
//! The payload is JSON-encoded and signed over `keccak(json(payload) ||
//! timestamp)` — the timestamp is appended to the digest input a second time,
//! outside the JSON, so a signature can't be replayed against a payload with
//! a different timestamp tacked on by a relay.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use shared_crypto::{keccak256_many, Secp256k1KeyPair, Secp256k1Signature};

use crate::errors::{P2pError, Result};

/// Node identifier: `keccak256(pubkey[1:])`, 32 bytes.
pub type NodeId = [u8; 32];

/// Handshake fields exchanged by both sides of a new connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakePayload {
    pub chain_id: u64,
    pub genesis_hash: [u8; 32],
    pub client_version: String,
    pub node_id: NodeId,
    pub listen_addr: String,
    pub timestamp: u64,
    pub nonce: [u8; 16],
}

/// A handshake payload plus the signature over its canonical digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakePacket {
    pub payload: HandshakePayload,
    pub signature: Secp256k1Signature,
}

impl HandshakePacket {
    /// The digest a handshake's signature is taken over:
    /// `keccak(json(payload) || timestamp)`.
    pub fn digest(payload: &HandshakePayload) -> Result<[u8; 32]> {
        let json = serde_json::to_vec(payload)?;
        Ok(keccak256_many(&[&json, &payload.timestamp.to_be_bytes()]))
    }

    /// Build and sign a handshake packet with the local node's key.
    pub fn sign(payload: HandshakePayload, key: &Secp256k1KeyPair) -> Result<Self> {
        let digest = Self::digest(&payload)?;
        let signature = key.sign(&digest);
        Ok(Self { payload, signature })
    }

    /// Size of the wire-encoded payload, checked against `max_message_bytes`
    /// before anything else — an oversized handshake is rejected without
    /// touching the signature or replay cache.
    pub fn encoded_len(&self) -> Result<usize> {
        Ok(serde_json::to_vec(&self.payload)?.len())
    }
}

/// Parameters a handshake is checked against.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    pub chain_id: u64,
    pub genesis_hash: [u8; 32],
    pub handshake_skew_secs: u64,
    pub max_message_bytes: usize,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            chain_id: 0,
            genesis_hash: [0u8; 32],
            handshake_skew_secs: 30,
            max_message_bytes: 64 * 1024,
        }
    }
}

/// Bounded FIFO of observed handshake nonces, rejecting replays. Oldest
/// nonces age out once `capacity` is exceeded — an attacker forcing eviction
/// would need more distinct handshakes than any real peer ever sends.
#[derive(Debug)]
pub struct ReplayCache {
    seen: VecDeque<[u8; 16]>,
    capacity: usize,
}

impl ReplayCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `nonce`, returning `false` if it was already observed.
    pub fn observe(&mut self, nonce: [u8; 16]) -> bool {
        if self.seen.contains(&nonce) {
            return false;
        }
        if self.seen.len() >= self.capacity {
            self.seen.pop_front();
        }
        self.seen.push_back(nonce);
        true
    }
}

/// Verify a peer's handshake packet: chain/genesis match, signature recovers
/// to the claimed `node_id`, timestamp within skew, nonce not replayed.
/// Returns the verified node id on success.
pub fn verify_handshake(
    packet: &HandshakePacket,
    config: &HandshakeConfig,
    replay_cache: &mut ReplayCache,
    now: u64,
) -> Result<NodeId> {
    let encoded_len = packet.encoded_len()?;
    if encoded_len > config.max_message_bytes {
        return Err(P2pError::OversizedHandshake {
            got: encoded_len,
            max: config.max_message_bytes,
        });
    }
    if packet.payload.chain_id != config.chain_id {
        return Err(P2pError::ChainMismatch {
            ours: config.chain_id,
            theirs: packet.payload.chain_id,
        });
    }
    if packet.payload.genesis_hash != config.genesis_hash {
        return Err(P2pError::GenesisMismatch);
    }
    let skew = now.abs_diff(packet.payload.timestamp);
    if skew > config.handshake_skew_secs {
        return Err(P2pError::TimestampSkew {
            timestamp: packet.payload.timestamp,
            skew_secs: config.handshake_skew_secs,
        });
    }
    let digest = HandshakePacket::digest(&packet.payload)?;
    let recovered = packet
        .signature
        .recover_node_id(&digest)
        .map_err(P2pError::BadSignature)?;
    if recovered != packet.payload.node_id {
        return Err(P2pError::NodeIdMismatch);
    }
    if !replay_cache.observe(packet.payload.nonce) {
        return Err(P2pError::ReplayedNonce);
    }
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> Secp256k1KeyPair {
        Secp256k1KeyPair::from_bytes([0x42; 32]).unwrap()
    }

    fn payload(key: &Secp256k1KeyPair, timestamp: u64, nonce: u8) -> HandshakePayload {
        HandshakePayload {
            chain_id: 7,
            genesis_hash: [1u8; 32],
            client_version: "nhb/0.1".into(),
            node_id: key.node_id(),
            listen_addr: "127.0.0.1:26656".into(),
            timestamp,
            nonce: [nonce; 16],
        }
    }

    fn config() -> HandshakeConfig {
        HandshakeConfig {
            chain_id: 7,
            genesis_hash: [1u8; 32],
            handshake_skew_secs: 30,
            max_message_bytes: 64 * 1024,
        }
    }

    #[test]
    fn valid_handshake_recovers_node_id() {
        let key = keypair();
        let packet = HandshakePacket::sign(payload(&key, 1_000, 1), &key).unwrap();
        let mut cache = ReplayCache::new(16);
        let node_id = verify_handshake(&packet, &config(), &mut cache, 1_000).unwrap();
        assert_eq!(node_id, key.node_id());
    }

    #[test]
    fn chain_mismatch_rejected() {
        let key = keypair();
        let mut p = payload(&key, 1_000, 2);
        p.chain_id = 99;
        let packet = HandshakePacket::sign(p, &key).unwrap();
        let mut cache = ReplayCache::new(16);
        let err = verify_handshake(&packet, &config(), &mut cache, 1_000).unwrap_err();
        assert!(matches!(err, P2pError::ChainMismatch { .. }));
    }

    #[test]
    fn genesis_mismatch_rejected() {
        let key = keypair();
        let mut p = payload(&key, 1_000, 3);
        p.genesis_hash = [9u8; 32];
        let packet = HandshakePacket::sign(p, &key).unwrap();
        let mut cache = ReplayCache::new(16);
        let err = verify_handshake(&packet, &config(), &mut cache, 1_000).unwrap_err();
        assert!(matches!(err, P2pError::GenesisMismatch));
    }

    #[test]
    fn stale_timestamp_rejected() {
        let key = keypair();
        let packet = HandshakePacket::sign(payload(&key, 1_000, 4), &key).unwrap();
        let mut cache = ReplayCache::new(16);
        let err = verify_handshake(&packet, &config(), &mut cache, 1_100).unwrap_err();
        assert!(matches!(err, P2pError::TimestampSkew { .. }));
    }

    #[test]
    fn tampered_payload_fails_signature_check() {
        let key = keypair();
        let mut packet = HandshakePacket::sign(payload(&key, 1_000, 5), &key).unwrap();
        packet.payload.client_version = "forged/9.9".into();
        let mut cache = ReplayCache::new(16);
        let err = verify_handshake(&packet, &config(), &mut cache, 1_000).unwrap_err();
        assert!(matches!(
            err,
            P2pError::NodeIdMismatch | P2pError::BadSignature(_)
        ));
    }

    #[test]
    fn replayed_nonce_rejected_on_second_use() {
        let key = keypair();
        let packet = HandshakePacket::sign(payload(&key, 1_000, 6), &key).unwrap();
        let mut cache = ReplayCache::new(16);
        verify_handshake(&packet, &config(), &mut cache, 1_000).unwrap();
        let err = verify_handshake(&packet, &config(), &mut cache, 1_000).unwrap_err();
        assert!(matches!(err, P2pError::ReplayedNonce));
    }

    #[test]
    fn oversized_payload_rejected_before_signature_check() {
        let key = keypair();
        let mut p = payload(&key, 1_000, 7);
        p.client_version = "x".repeat(1_000_000);
        let packet = HandshakePacket::sign(p, &key).unwrap();
        let mut cache = ReplayCache::new(16);
        let mut small_config = config();
        small_config.max_message_bytes = 256;
        let err = verify_handshake(&packet, &small_config, &mut cache, 1_000).unwrap_err();
        assert!(matches!(err, P2pError::OversizedHandshake { .. }));
    }

    #[test]
    fn replay_cache_evicts_oldest_past_capacity() {
        let mut cache = ReplayCache::new(2);
        assert!(cache.observe([1; 16]));
        assert!(cache.observe([2; 16]));
        assert!(cache.observe([3; 16]));
        // [1;16] aged out, so it is accepted again.
        assert!(cache.observe([1; 16]));
        // [2;16] should have been evicted to make room for [3;16].
        assert!(cache.observe([2; 16]));
    }
}
