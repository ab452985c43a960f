//! Validator set persistence (§6's `consensus/validatorset`). Always sorted
//! by address so two independent genesis constructions from the same spec
//! serialize byte-identically.

use nhb_trie::TrieDb;
use serde::{Deserialize, Serialize};
use shared_types::Address;

use crate::keys;
use crate::state::State;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorEntry {
    pub address: Address,
    pub power: u64,
    pub moniker: String,
    pub pubkey: Vec<u8>,
}

impl<D: TrieDb + Clone> State<D> {
    pub fn write_validator_set(&mut self, mut entries: Vec<ValidatorEntry>) {
        entries.sort_by(|a, b| a.address.cmp(&b.address));
        self.put(keys::validator_set_key(), &entries);
    }

    pub fn load_validator_set(&self) -> Vec<ValidatorEntry> {
        self.get(&keys::validator_set_key()).unwrap_or_default()
    }
}
