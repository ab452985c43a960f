//! Current epoch bookkeeping (§4.5). Composite validator weighting, the
//! descending-weight snapshot, and rotation decisions live in
//! `nhb-state-processor::epoch`; this module only stores which epoch is
//! live and where it started.

use nhb_trie::TrieDb;
use serde::{Deserialize, Serialize};

use crate::keys;
use crate::state::State;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: u64,
    pub start_height: u64,
}

impl<D: TrieDb + Clone> State<D> {
    pub fn get_current_epoch(&self) -> EpochRecord {
        self.get(&keys::current_epoch_key()).unwrap_or_default()
    }

    pub fn set_current_epoch(&mut self, record: EpochRecord) {
        self.put(keys::current_epoch_key(), &record);
    }
}
