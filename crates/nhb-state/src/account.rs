//! Account CRUD and the generic per-symbol balance ledger.
//!
//! `NHB`/`ZNHB` are mirrored onto [`Account::balance_nhb`]/[`Account::balance_znhb`]
//! for legacy readers that only know the two native tokens; every other
//! symbol lives solely in the per-`(address, symbol)` ledger.

use nhb_trie::TrieDb;
use shared_types::{Account, Address, Amount};

use crate::keys;
use crate::state::State;

impl<D: TrieDb + Clone> State<D> {
    pub fn get_account(&self, address: &Address) -> Account {
        self.get(&keys::account_key(address)).unwrap_or_default()
    }

    pub fn put_account(&mut self, address: &Address, account: Account) {
        self.put(keys::account_key(address), &account);
    }

    pub fn get_balance(&self, address: &Address, symbol: &str) -> Amount {
        let symbol = normalize_symbol(symbol);
        match symbol.as_str() {
            "NHB" => self.get_account(address).balance_nhb,
            "ZNHB" => self.get_account(address).balance_znhb,
            _ => self
                .get(&keys::balance_key(address, &symbol))
                .unwrap_or_default(),
        }
    }

    pub fn set_balance(&mut self, address: &Address, symbol: &str, amount: Amount) {
        let symbol = normalize_symbol(symbol);
        self.put(keys::balance_key(address, &symbol), &amount);

        let mut account = self.get_account(address);
        match symbol.as_str() {
            "NHB" => account.balance_nhb = amount,
            "ZNHB" => account.balance_znhb = amount,
            _ => {}
        }
        self.put_account(address, account);
    }

    /// Remembers that `address` has at least one pending unbond so
    /// `BeginBlock` can find it without scanning every account. Stale
    /// entries (accounts whose unbonds have all settled) are harmless —
    /// the sweep just finds nothing to release for them.
    pub fn track_pending_unbond(&mut self, address: &Address) {
        self.index_insert(keys::index_key(keys::PENDING_UNBOND_INDEX_KEY), address.to_bech32_nhb());
    }

    pub fn accounts_with_pending_unbonds(&self) -> Vec<Address> {
        self.index_list(keys::index_key(keys::PENDING_UNBOND_INDEX_KEY))
            .into_iter()
            .filter_map(|s| Address::from_bech32_any(&s).ok())
            .collect()
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhb_trie::MemoryTrieDb;
    use shared_types::Address;

    #[test]
    fn missing_account_defaults_to_zero() {
        let state = State::<MemoryTrieDb>::new();
        let account = state.get_account(&Address::ZERO);
        assert_eq!(account.nonce, 0);
        assert!(account.balance_nhb.is_zero());
    }

    #[test]
    fn set_balance_mirrors_nhb_onto_account() {
        let mut state = State::<MemoryTrieDb>::new();
        state.set_balance(&Address::ZERO, "nhb", Amount::from(500u64));
        assert_eq!(state.get_balance(&Address::ZERO, "NHB"), Amount::from(500u64));
        assert_eq!(
            state.get_account(&Address::ZERO).balance_nhb,
            Amount::from(500u64)
        );
    }

    #[test]
    fn other_symbols_do_not_touch_legacy_fields() {
        let mut state = State::<MemoryTrieDb>::new();
        state.set_balance(&Address::ZERO, "USDC", Amount::from(10u64));
        assert_eq!(state.get_balance(&Address::ZERO, "USDC"), Amount::from(10u64));
        assert!(state.get_account(&Address::ZERO).balance_nhb.is_zero());
    }
}
