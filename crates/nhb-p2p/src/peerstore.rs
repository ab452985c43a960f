//! The peerstore: known addresses, dial backoff state, and persisted bans
//! (§4.9). Seeds, bootnodes and persistent peers are merged into it at
//! startup; PEX responses top it up afterwards.

use std::collections::HashMap;

use crate::handshake::NodeId;

#[derive(Debug, Clone)]
pub struct PeerStoreConfig {
    pub dial_backoff_secs: u64,
    pub max_dial_backoff_secs: u64,
}

impl Default for PeerStoreConfig {
    fn default() -> Self {
        Self {
            dial_backoff_secs: 5,
            max_dial_backoff_secs: 3600,
        }
    }
}

/// A peer descriptor as exchanged over PEX or supplied as a seed/bootnode.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PeerDescriptor {
    pub addr: String,
    pub node_id: Option<NodeId>,
}

#[derive(Debug, Clone)]
struct PeerRecord {
    descriptor: PeerDescriptor,
    next_backoff_secs: u64,
    dial_after_secs: u64,
    banned_until_secs: Option<u64>,
}

impl PeerRecord {
    fn new(descriptor: PeerDescriptor, config: &PeerStoreConfig) -> Self {
        Self {
            descriptor,
            next_backoff_secs: config.dial_backoff_secs,
            dial_after_secs: 0,
            banned_until_secs: None,
        }
    }
}

/// Known addresses and their dial/ban state, keyed by socket address.
#[derive(Debug)]
pub struct PeerStore {
    peers: HashMap<String, PeerRecord>,
    config: PeerStoreConfig,
}

impl PeerStore {
    pub fn new(config: PeerStoreConfig) -> Self {
        Self {
            peers: HashMap::new(),
            config,
        }
    }

    /// Merge seeds, bootnodes and persistent peers into the store at startup.
    /// Duplicates (by address) are ignored.
    pub fn merge_known(&mut self, addrs: impl IntoIterator<Item = String>) {
        for addr in addrs {
            self.peers.entry(addr.clone()).or_insert_with(|| {
                PeerRecord::new(
                    PeerDescriptor {
                        addr,
                        node_id: None,
                    },
                    &self.config,
                )
            });
        }
    }

    /// Absorb peer descriptors learned via PEX. Known node ids are filled in
    /// once learned; addresses we've never heard of are added fresh.
    pub fn ingest_pex(&mut self, descriptors: impl IntoIterator<Item = PeerDescriptor>) {
        for d in descriptors {
            match self.peers.get_mut(&d.addr) {
                Some(existing) => {
                    if existing.descriptor.node_id.is_none() {
                        existing.descriptor.node_id = d.node_id;
                    }
                }
                None => {
                    self.peers
                        .insert(d.addr.clone(), PeerRecord::new(d, &self.config));
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Addresses eligible to dial right now: not banned, not within their
    /// backoff window, capped at `budget` entries.
    pub fn dial_candidates(&self, now_secs: u64, budget: usize) -> Vec<PeerDescriptor> {
        self.peers
            .values()
            .filter(|r| !self.is_banned_record(r, now_secs))
            .filter(|r| now_secs >= r.dial_after_secs)
            .take(budget)
            .map(|r| r.descriptor.clone())
            .collect()
    }

    /// Up to `n` descriptors suitable for handing to a peer via
    /// `pex.response` — banned addresses are never advertised.
    pub fn pex_sample(&self, n: usize, now_secs: u64) -> Vec<PeerDescriptor> {
        self.peers
            .values()
            .filter(|r| !self.is_banned_record(r, now_secs))
            .take(n)
            .map(|r| r.descriptor.clone())
            .collect()
    }

    /// Double the address's backoff (capped) after a failed dial attempt.
    pub fn record_dial_failure(&mut self, addr: &str, now_secs: u64) {
        if let Some(record) = self.peers.get_mut(addr) {
            record.dial_after_secs = now_secs + record.next_backoff_secs;
            record.next_backoff_secs = (record.next_backoff_secs * 2).min(self.config.max_dial_backoff_secs);
        }
    }

    /// Reset the address's backoff to its base value after a successful dial.
    pub fn record_dial_success(&mut self, addr: &str) {
        if let Some(record) = self.peers.get_mut(addr) {
            record.next_backoff_secs = self.config.dial_backoff_secs;
            record.dial_after_secs = 0;
        }
    }

    /// Persist a ban against an address, e.g. after its peer crossed `ban_score`.
    pub fn ban(&mut self, addr: &str, until_secs: u64) {
        if let Some(record) = self.peers.get_mut(addr) {
            record.banned_until_secs = Some(until_secs);
        }
    }

    pub fn is_banned(&self, addr: &str, now_secs: u64) -> bool {
        self.peers
            .get(addr)
            .is_some_and(|r| self.is_banned_record(r, now_secs))
    }

    fn is_banned_record(&self, record: &PeerRecord, now_secs: u64) -> bool {
        record.banned_until_secs.is_some_and(|until| now_secs < until)
    }
}
