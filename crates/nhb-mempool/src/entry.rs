//! A transaction sitting in the pool, wrapped in an `Arc` so that a
//! proposal round-trips through propose/commit/rollback without ever
//! cloning the underlying transaction — pointer identity survives a
//! rollback, which the race-obligation tests depend on.

use std::sync::Arc;

use shared_types::{Address, Hash, Transaction};

#[derive(Clone, Debug)]
pub struct MempoolEntry {
    pub tx: Arc<Transaction>,
    pub hash: Hash,
    pub sender: Address,
    pub nonce: u64,
    pub added_at: u64,
}

impl MempoolEntry {
    pub fn new(tx: Transaction, sender: Address, added_at: u64) -> Self {
        let hash = tx.hash();
        let nonce = tx.nonce;
        Self {
            tx: Arc::new(tx),
            hash,
            sender,
            nonce,
            added_at,
        }
    }

    /// Whether `other` is the exact same in-memory transaction, not merely
    /// an equal one.
    pub fn same_instance(&self, other: &MempoolEntry) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}
