//! Reward engine persisted counters (§4.4). The accrual math — global index
//! update, emission schedule lookup, epoch pool splits with remainder
//! distribution — lives in `nhb-state-processor::reward`; this module only
//! stores the numbers that must survive a restart.

use nhb_trie::TrieDb;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Amount};

use crate::keys;
use crate::state::State;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardIndexRecord {
    pub index: Amount,
    pub last_update: u64,
}

/// Accrued-but-not-yet-settled pool balances for one epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochPoolAccrual {
    pub validators_pool: Amount,
    pub stakers_pool: Amount,
    pub engagement_pool: Amount,
}

impl<D: TrieDb + Clone> State<D> {
    pub fn get_reward_index(&self) -> RewardIndexRecord {
        self.get(&keys::reward_index_key()).unwrap_or_default()
    }

    pub fn set_reward_index(&mut self, record: RewardIndexRecord) {
        self.put(keys::reward_index_key(), &record);
    }

    pub fn get_epoch_accrual(&self, epoch: u64) -> EpochPoolAccrual {
        self.get(&keys::epoch_accrual_key(epoch)).unwrap_or_default()
    }

    pub fn set_epoch_accrual(&mut self, epoch: u64, accrual: EpochPoolAccrual) {
        self.put(keys::epoch_accrual_key(epoch), &accrual);
    }

    /// Cumulative amount minted against a token's emission schedule, used by
    /// the cap computation (`pool = min(scheduled, epoch_cap, remaining)`).
    pub fn get_minted_so_far(&self, token: &str) -> Amount {
        self.get(&keys::minted_key(token)).unwrap_or_default()
    }

    pub fn add_minted(&mut self, token: &str, amount: Amount) {
        let total = self.get_minted_so_far(token) + amount;
        self.put(keys::minted_key(token), &total);
    }

    /// The global reward index value this account last claimed against,
    /// used to compute the delta owed on the next `ClaimRewards`.
    pub fn get_last_claimed_index(&self, address: &Address) -> Amount {
        self.get(&keys::last_claimed_index_key(address)).unwrap_or_default()
    }

    pub fn set_last_claimed_index(&mut self, address: &Address, index: Amount) {
        self.put(keys::last_claimed_index_key(address), &index);
    }
}
