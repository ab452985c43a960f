//! # Transaction pool
//!
//! Concurrent Add/Get with proposal-in-flight exclusion and two-phase
//! commit/rollback (§4.8): `Propose` atomically drains every admitted entry
//! into an in-flight batch; `Commit` prunes whichever of that batch a block
//! actually included and returns the rest to `admitted`; `Rollback` returns
//! the whole batch verbatim, preserving insertion order and `Arc` identity.
//!
//! Unlike a gas-price priority queue, ordering here is pure insertion order
//! (the proposer places transactions in the order they were admitted); the
//! block producer is responsible for any nonce tie-break among entries from
//! the same sender.

use std::collections::HashSet;

use parking_lot::Mutex;
use shared_types::{Address, Hash, Transaction};

use crate::entry::MempoolEntry;
use crate::errors::{MempoolError, Result};

#[derive(Clone, Debug)]
pub struct MempoolConfig {
    /// Maximum combined admitted + in-flight entries.
    pub limit: usize,
    /// When set, `add` never rejects with `Full` regardless of `limit`.
    pub unlimited_opt_in: bool,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            limit: 5000,
            unlimited_opt_in: false,
        }
    }
}

struct Inner {
    admitted: Vec<MempoolEntry>,
    in_flight: Option<Vec<MempoolEntry>>,
    seen: HashSet<(Address, u64, Hash)>,
}

/// A mutex-guarded pool, safe to share across producer threads via `Arc`.
pub struct Mempool {
    config: MempoolConfig,
    inner: Mutex<Inner>,
}

impl Mempool {
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                admitted: Vec::new(),
                in_flight: None,
                seen: HashSet::new(),
            }),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(MempoolConfig::default())
    }

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    /// Admitted plus in-flight entries — the pool's full footprint.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.admitted.len() + inner.in_flight.as_ref().map_or(0, |b| b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries available for the next `propose` call. Empty while a
    /// proposal is in flight, by construction (they were drained into it).
    pub fn pending(&self) -> Vec<MempoolEntry> {
        self.inner.lock().admitted.clone()
    }

    pub fn get(&self, hash: &Hash) -> Option<MempoolEntry> {
        let inner = self.inner.lock();
        inner
            .admitted
            .iter()
            .chain(inner.in_flight.iter().flatten())
            .find(|e| &e.hash == hash)
            .cloned()
    }

    pub fn sender_count(&self, sender: &Address) -> usize {
        let inner = self.inner.lock();
        inner
            .admitted
            .iter()
            .chain(inner.in_flight.iter().flatten())
            .filter(|e| &e.sender == sender)
            .count()
    }

    /// Admits `tx`, deduplicating by `(sender, nonce, hash)`. `simulate`,
    /// when given, runs a dry application — a discarded trie copy, owned by
    /// the caller — and rejects the transaction on its error.
    pub fn add(
        &self,
        tx: Transaction,
        sender: Address,
        now: u64,
        simulate: Option<&dyn Fn(&Transaction) -> std::result::Result<(), String>>,
    ) -> Result<Hash> {
        let hash = tx.hash();
        let nonce = tx.nonce;
        let key = (sender, nonce, hash);

        let mut inner = self.inner.lock();
        if inner.seen.contains(&key) {
            return Err(MempoolError::Duplicate {
                sender,
                nonce,
                hash,
            });
        }

        let total = inner.admitted.len() + inner.in_flight.as_ref().map_or(0, |b| b.len());
        if total >= self.config.limit && !self.config.unlimited_opt_in {
            return Err(MempoolError::Full {
                limit: self.config.limit,
            });
        }

        if let Some(check) = simulate {
            check(&tx).map_err(MempoolError::SimulationRejected)?;
        }

        inner.seen.insert(key);
        inner.admitted.push(MempoolEntry::new(tx, sender, now));
        Ok(hash)
    }

    /// Drains every admitted entry into the in-flight slot and returns a
    /// snapshot. Returns an empty vec, not an error, if a proposal is
    /// already in flight — callers treat "nothing to propose" the same way
    /// whether the pool is genuinely empty or mid-resolution.
    pub fn propose(&self) -> Vec<MempoolEntry> {
        let mut inner = self.inner.lock();
        if inner.in_flight.is_some() {
            return Vec::new();
        }
        let proposed = std::mem::take(&mut inner.admitted);
        inner.in_flight = Some(proposed.clone());
        proposed
    }

    /// Phase 2a: permanently drops the entries in `included` from the
    /// in-flight batch; everything else goes back to `admitted`, ahead of
    /// anything admitted while the proposal was out, preserving FIFO order.
    pub fn commit(&self, included: &[Hash]) -> Result<Vec<Hash>> {
        let mut inner = self.inner.lock();
        let batch = inner
            .in_flight
            .take()
            .ok_or(MempoolError::NoProposalInFlight)?;
        let included_set: HashSet<&Hash> = included.iter().collect();

        let mut confirmed = Vec::with_capacity(included.len());
        let mut returning = Vec::with_capacity(batch.len());
        for entry in batch {
            if included_set.contains(&entry.hash) {
                inner.seen.remove(&(entry.sender, entry.nonce, entry.hash));
                confirmed.push(entry.hash);
            } else {
                returning.push(entry);
            }
        }
        returning.append(&mut inner.admitted);
        inner.admitted = returning;
        Ok(confirmed)
    }

    /// Phase 2b: restores the whole in-flight batch to `admitted` verbatim
    /// — same entries, same order, same `Arc` pointers.
    pub fn rollback(&self) -> Result<Vec<MempoolEntry>> {
        let mut inner = self.inner.lock();
        let mut batch = inner
            .in_flight
            .take()
            .ok_or(MempoolError::NoProposalInFlight)?;
        batch.append(&mut inner.admitted);
        inner.admitted = batch.clone();
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Amount, ChainId, TxType};
    use std::sync::Arc;
    use std::thread;

    fn make_tx(sender_byte: u8, nonce: u64) -> (Transaction, Address) {
        let tx = Transaction {
            chain_id: ChainId(1),
            tx_type: TxType::Transfer,
            nonce,
            to: Some(Address([0xBB; 20])),
            value: Amount::zero(),
            gas_limit: 21_000,
            gas_price: Amount::from(1_000_000_000u64),
            data: vec![sender_byte],
            paymaster: None,
            paymaster_signature: None,
            signature: shared_crypto::Secp256k1Signature::from_parts([0; 32], [0; 32], 27),
            merchant_address: None,
        };
        (tx, Address([sender_byte; 20]))
    }

    #[test]
    fn add_rejects_duplicate_sender_nonce_hash() {
        let pool = Mempool::with_defaults();
        let (tx, sender) = make_tx(0xAA, 0);
        pool.add(tx.clone(), sender, 1000, None).unwrap();
        let err = pool.add(tx, sender, 1000, None).unwrap_err();
        assert!(matches!(err, MempoolError::Duplicate { .. }));
    }

    #[test]
    fn add_rejects_when_full_without_opt_in() {
        let pool = Mempool::new(MempoolConfig {
            limit: 1,
            unlimited_opt_in: false,
        });
        let (tx0, s0) = make_tx(0xAA, 0);
        let (tx1, s1) = make_tx(0xBB, 0);
        pool.add(tx0, s0, 1000, None).unwrap();
        let err = pool.add(tx1, s1, 1000, None).unwrap_err();
        assert!(matches!(err, MempoolError::Full { limit: 1 }));
    }

    #[test]
    fn concurrent_adds_converge_to_the_limit() {
        let pool = Arc::new(Mempool::new(MempoolConfig {
            limit: 3,
            unlimited_opt_in: false,
        }));
        let mut handles = Vec::new();
        for worker in 0..2u8 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                let mut full_count = 0;
                for i in 0..3u8 {
                    let (tx, sender) = make_tx(worker * 10 + i, 0);
                    if pool.add(tx, sender, 1000, None).is_err() {
                        full_count += 1;
                    }
                }
                full_count
            }));
        }
        let rejections: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(pool.len(), 3);
        assert!(rejections >= 1);
    }

    #[test]
    fn simulation_hook_can_reject_admission() {
        let pool = Mempool::with_defaults();
        let (tx, sender) = make_tx(0xAA, 0);
        let reject = |_: &Transaction| Err("insufficient balance".to_string());
        let err = pool.add(tx, sender, 1000, Some(&reject)).unwrap_err();
        assert!(matches!(err, MempoolError::SimulationRejected(_)));
    }

    #[test]
    fn propose_drains_admitted_and_further_calls_return_empty() {
        let pool = Mempool::with_defaults();
        let (tx, sender) = make_tx(0xAA, 0);
        pool.add(tx, sender, 1000, None).unwrap();

        let proposed = pool.propose();
        assert_eq!(proposed.len(), 1);
        assert!(pool.pending().is_empty());

        // A proposal is already in flight: further calls see nothing.
        assert!(pool.propose().is_empty());
    }

    #[test]
    fn commit_prunes_included_and_returns_the_rest() {
        let pool = Mempool::with_defaults();
        let (tx0, s0) = make_tx(0xAA, 0);
        let (tx1, s1) = make_tx(0xBB, 0);
        let hash0 = pool.add(tx0, s0, 1000, None).unwrap();
        let hash1 = pool.add(tx1, s1, 1000, None).unwrap();

        let proposed = pool.propose();
        assert_eq!(proposed.len(), 2);

        let confirmed = pool.commit(&[hash0]).unwrap();
        assert_eq!(confirmed, vec![hash0]);

        // tx1 was proposed but not included in the committed block — it
        // must still be available, per the "mempool_after ⊇ before \ txs"
        // property.
        assert!(pool.get(&hash1).is_some());
        assert_eq!(pool.len(), 1);

        // Re-adding a confirmed (sender, nonce, hash) is no longer a
        // duplicate since it was dropped from `seen` on commit.
        let (tx0_again, _) = make_tx(0xAA, 0);
        pool.add(tx0_again, s0, 2000, None).unwrap();
    }

    #[test]
    fn rollback_restores_exact_pointer_identity() {
        let pool = Mempool::with_defaults();
        let (tx, sender) = make_tx(0xAA, 0);
        pool.add(tx, sender, 1000, None).unwrap();

        let proposed = pool.propose();
        let original = proposed[0].clone();

        let rolled_back = pool.rollback().unwrap();
        assert_eq!(rolled_back.len(), 1);
        assert!(original.same_instance(&rolled_back[0]));

        let pending = pool.pending();
        assert_eq!(pending.len(), 1);
        assert!(original.same_instance(&pending[0]));
    }

    #[test]
    fn commit_or_rollback_without_a_proposal_errors() {
        let pool = Mempool::with_defaults();
        assert!(matches!(
            pool.commit(&[]).unwrap_err(),
            MempoolError::NoProposalInFlight
        ));
        assert!(matches!(
            pool.rollback().unwrap_err(),
            MempoolError::NoProposalInFlight
        ));
    }
}
