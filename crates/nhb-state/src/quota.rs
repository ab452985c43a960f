//! Per-`(sender, module, epoch_bucket)` request counters backing the
//! quota model in §4.6. The bucket boundary (how `epoch_bucket` maps to
//! wall-clock time) is the state processor's concern; this module only
//! stores and compares the count.

use nhb_trie::TrieDb;
use serde::{Deserialize, Serialize};
use shared_types::Address;

use crate::keys;
use crate::state::State;

/// The currently active quota bucket and when it started, so `EndBlock` can
/// tell whether `EpochSeconds` has elapsed without recomputing the bucket
/// from wall-clock time on every check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaEpochRecord {
    pub bucket: u64,
    pub started_at: u64,
}

impl<D: TrieDb + Clone> State<D> {
    pub fn get_quota_epoch(&self) -> QuotaEpochRecord {
        self.get(&keys::quota_epoch_key()).unwrap_or_default()
    }

    pub fn set_quota_epoch(&mut self, record: QuotaEpochRecord) {
        self.put(keys::quota_epoch_key(), &record);
    }

    pub fn quota_count(&self, sender: &Address, module: &str, epoch_bucket: u64) -> u64 {
        self.get(&keys::quota_key(sender, module, epoch_bucket))
            .unwrap_or(0)
    }

    /// Returns `true` and records the attempt if under `max_per_bucket`;
    /// returns `false` without mutating state if the quota is exhausted.
    pub fn check_and_record(
        &mut self,
        sender: &Address,
        module: &str,
        epoch_bucket: u64,
        max_per_bucket: u64,
    ) -> bool {
        let count = self.quota_count(sender, module, epoch_bucket);
        if count >= max_per_bucket {
            return false;
        }
        self.put(keys::quota_key(sender, module, epoch_bucket), &(count + 1));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhb_trie::MemoryTrieDb;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let mut state = State::<MemoryTrieDb>::new();
        let sender = Address([0x01; 20]);
        assert!(state.check_and_record(&sender, "pos", 1, 2));
        assert!(state.check_and_record(&sender, "pos", 1, 2));
        assert!(!state.check_and_record(&sender, "pos", 1, 2));
    }

    #[test]
    fn different_buckets_are_independent() {
        let mut state = State::<MemoryTrieDb>::new();
        let sender = Address([0x01; 20]);
        assert!(state.check_and_record(&sender, "pos", 1, 1));
        assert!(!state.check_and_record(&sender, "pos", 1, 1));
        assert!(state.check_and_record(&sender, "pos", 2, 1));
    }
}
