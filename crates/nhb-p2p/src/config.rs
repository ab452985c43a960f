//! Consolidated P2P server configuration (§4.9).

use crate::handshake::HandshakeConfig;
use crate::peerstore::PeerStoreConfig;
use crate::score::ScoreConfig;

#[derive(Debug, Clone)]
pub struct P2pConfig {
    pub chain_id: u64,
    pub genesis_hash: [u8; 32],
    pub client_version: String,
    pub listen_addr: String,

    pub handshake_skew_secs: u64,
    pub max_message_bytes: usize,

    pub rate_msgs_per_sec: f64,
    pub burst: f64,

    pub grey_score: u32,
    pub ban_score: u32,
    pub ban_duration_secs: u64,

    pub seeds: Vec<String>,
    pub bootnodes: Vec<String>,
    pub persistent_peers: Vec<String>,
    pub max_outbound: usize,
    pub dial_backoff_secs: u64,
    pub max_dial_backoff_secs: u64,

    pub pex_sample_size: usize,
    pub pex_interval_secs: u64,
    pub min_peers: usize,

    pub ping_interval_secs: u64,
    pub ping_timeout_secs: u64,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            chain_id: 0,
            genesis_hash: [0u8; 32],
            client_version: "nhb/0.1".to_string(),
            listen_addr: "0.0.0.0:26656".to_string(),
            handshake_skew_secs: 30,
            max_message_bytes: 64 * 1024,
            rate_msgs_per_sec: 50.0,
            burst: 100.0,
            grey_score: 50,
            ban_score: 100,
            ban_duration_secs: 24 * 3600,
            seeds: vec![],
            bootnodes: vec![],
            persistent_peers: vec![],
            max_outbound: 16,
            dial_backoff_secs: 5,
            max_dial_backoff_secs: 3600,
            pex_sample_size: 20,
            pex_interval_secs: 300,
            min_peers: 8,
            ping_interval_secs: 30,
            ping_timeout_secs: 10,
        }
    }
}

impl P2pConfig {
    pub fn handshake_config(&self) -> HandshakeConfig {
        HandshakeConfig {
            chain_id: self.chain_id,
            genesis_hash: self.genesis_hash,
            handshake_skew_secs: self.handshake_skew_secs,
            max_message_bytes: self.max_message_bytes,
        }
    }

    pub fn score_config(&self) -> ScoreConfig {
        ScoreConfig {
            grey_score: self.grey_score,
            ban_score: self.ban_score,
            ban_duration_secs: self.ban_duration_secs,
        }
    }

    pub fn peerstore_config(&self) -> PeerStoreConfig {
        PeerStoreConfig {
            dial_backoff_secs: self.dial_backoff_secs,
            max_dial_backoff_secs: self.max_dial_backoff_secs,
        }
    }

    /// Seeds, bootnodes and persistent peers merged into one startup list.
    pub fn known_addrs(&self) -> Vec<String> {
        self.seeds
            .iter()
            .chain(self.bootnodes.iter())
            .chain(self.persistent_peers.iter())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_addrs_merges_all_three_lists_without_deduping() {
        let config = P2pConfig {
            seeds: vec!["a".to_string()],
            bootnodes: vec!["b".to_string()],
            persistent_peers: vec!["c".to_string()],
            ..P2pConfig::default()
        };
        assert_eq!(config.known_addrs(), vec!["a", "b", "c"]);
    }
}
