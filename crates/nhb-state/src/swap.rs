//! Swap vouchers (§4.12): mint-only ledger entries. No reversal exists.

use nhb_trie::TrieDb;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Amount, Hash};

use crate::keys;
use crate::state::State;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapVoucher {
    pub id: Hash,
    pub provider: Address,
    pub recipient: Address,
    pub amount: Amount,
    pub token: String,
    pub minted_at: u64,
}

/// Result of [`State::mint_swap_voucher`]: whether the provider's configured
/// per-epoch alert threshold was crossed by this mint.
pub struct MintOutcome {
    pub voucher: SwapVoucher,
    pub alert_triggered: bool,
}

impl<D: TrieDb + Clone> State<D> {
    pub fn get_swap_voucher(&self, id: &Hash) -> Option<SwapVoucher> {
        self.get(&keys::swap_voucher_key(id))
    }

    pub fn mint_swap_voucher(
        &mut self,
        id: Hash,
        provider: Address,
        recipient: Address,
        amount: Amount,
        token: &str,
        minted_at: u64,
        epoch_bucket: u64,
        per_epoch_alert_threshold: Option<Amount>,
    ) -> MintOutcome {
        let voucher = SwapVoucher {
            id,
            provider,
            recipient,
            amount,
            token: token.to_string(),
            minted_at,
        };
        self.put(keys::swap_voucher_key(&id), &voucher);

        let epoch_key = keys::quota_key(&provider, "swap_epoch", epoch_bucket);
        let minted_so_far: Amount = self.get(&epoch_key).unwrap_or_default();
        let new_total = minted_so_far + amount;
        self.put(epoch_key, &new_total);

        let alert_triggered = per_epoch_alert_threshold
            .map(|threshold| new_total > threshold)
            .unwrap_or(false);

        MintOutcome {
            voucher,
            alert_triggered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhb_trie::MemoryTrieDb;

    #[test]
    fn mint_persists_voucher() {
        let mut state = State::<MemoryTrieDb>::new();
        let provider = Address([0x01; 20]);
        let recipient = Address([0x02; 20]);
        let outcome = state.mint_swap_voucher(
            [1; 32],
            provider,
            recipient,
            Amount::from(100u64),
            "NHB",
            1000,
            1,
            None,
        );
        assert!(!outcome.alert_triggered);
        assert_eq!(state.get_swap_voucher(&[1; 32]).unwrap().amount, Amount::from(100u64));
    }

    #[test]
    fn alert_fires_once_epoch_threshold_crossed() {
        let mut state = State::<MemoryTrieDb>::new();
        let provider = Address([0x01; 20]);
        let recipient = Address([0x02; 20]);
        let threshold = Some(Amount::from(150u64));

        let first = state.mint_swap_voucher(
            [1; 32], provider, recipient, Amount::from(100u64), "NHB", 1000, 1, threshold,
        );
        assert!(!first.alert_triggered);

        let second = state.mint_swap_voucher(
            [2; 32], provider, recipient, Amount::from(100u64), "NHB", 1001, 1, threshold,
        );
        assert!(second.alert_triggered);
    }
}
