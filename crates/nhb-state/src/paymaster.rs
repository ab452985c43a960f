//! Paymaster throttle counters (§4.7). The throttle *policy* (which scopes
//! apply, what the limits are) lives in `nhb-state-processor`; this module
//! only owns the persisted counters the policy reads and writes.

use nhb_trie::TrieDb;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Amount};

use crate::keys;
use crate::state::State;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendRecord {
    pub used: Amount,
    pub tx_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpRecord {
    pub last_topup_unix: u64,
    pub minted_today: Amount,
    pub day: String,
}

impl<D: TrieDb + Clone> State<D> {
    pub fn get_spend(&self, scope: &str, id: &str, day: &str) -> SpendRecord {
        self.get(&keys::spend_key(scope, id, day)).unwrap_or_default()
    }

    pub fn record_spend(&mut self, scope: &str, id: &str, day: &str, amount: Amount) {
        let mut record = self.get_spend(scope, id, day);
        record.used += amount;
        record.tx_count += 1;
        self.put(keys::spend_key(scope, id, day), &record);
    }

    pub fn get_topup_record(&self, paymaster: &Address) -> TopUpRecord {
        self.get(&keys::paymaster_topup_key(paymaster)).unwrap_or_default()
    }

    pub fn put_topup_record(&mut self, paymaster: &Address, record: TopUpRecord) {
        self.put(keys::paymaster_topup_key(paymaster), &record);
    }
}
