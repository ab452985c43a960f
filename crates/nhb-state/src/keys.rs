//! Trie key derivation. Every namespace hashes its own tag together with the
//! entry's natural identifier so collisions across namespaces are impossible;
//! index keys are fixed so the small number of enumerable registries
//! (tokens, validators, roles, ...) can be listed back out in a stable order.

use shared_crypto::keccak256_many;
use shared_types::{Address, Hash};

fn namespaced(tag: &[u8], parts: &[&[u8]]) -> Hash {
    let mut inputs: Vec<&[u8]> = Vec::with_capacity(parts.len() + 1);
    inputs.push(tag);
    inputs.extend_from_slice(parts);
    keccak256_many(&inputs)
}

pub fn account_key(address: &Address) -> Hash {
    namespaced(b"account", &[address.as_bytes()])
}

pub fn balance_key(address: &Address, symbol: &str) -> Hash {
    namespaced(b"balance", &[address.as_bytes(), symbol.as_bytes()])
}

pub fn token_key(symbol: &str) -> Hash {
    namespaced(b"token", &[symbol.as_bytes()])
}

pub const TOKEN_INDEX_KEY: &[u8] = b"index:tokens";
pub const PENDING_UNBOND_INDEX_KEY: &[u8] = b"index:pending_unbond_accounts";

pub fn role_key(role: &str) -> Hash {
    namespaced(b"role", &[role.as_bytes()])
}

pub fn validator_set_key() -> Hash {
    namespaced(b"index", &[b"validators"])
}

pub fn alias_key(alias: &str) -> Hash {
    namespaced(b"alias", &[alias.as_bytes()])
}

pub fn alias_owner_key(address: &Address) -> Hash {
    namespaced(b"alias_owner", &[address.as_bytes()])
}

/// Daily spend counter for an arbitrary scope (`"paymaster"`, `"merchant"`,
/// `"device"`, `"global"`) identified by `id` (empty string for `"global"`).
pub fn spend_key(scope: &str, id: &str, day: &str) -> Hash {
    namespaced(b"spend", &[scope.as_bytes(), id.as_bytes(), day.as_bytes()])
}

pub fn paymaster_topup_key(paymaster: &Address) -> Hash {
    namespaced(b"paymaster_topup", &[paymaster.as_bytes()])
}

pub fn merchant_key(merchant_id: &str) -> Hash {
    namespaced(b"pos_merchant", &[merchant_id.as_bytes()])
}

pub fn device_key(device_id: &str) -> Hash {
    namespaced(b"pos_device", &[device_id.as_bytes()])
}

pub fn claimable_key(id: &[u8; 32]) -> Hash {
    namespaced(b"claimable", &[id])
}

pub const CLAIMABLE_INDEX_KEY: &[u8] = b"index:claimables";

pub fn loyalty_program_key(program_id: &str) -> Hash {
    namespaced(b"loyalty_program", &[program_id.as_bytes()])
}

pub fn quota_key(sender: &Address, module: &str, epoch_bucket: u64) -> Hash {
    namespaced(
        b"quota",
        &[sender.as_bytes(), module.as_bytes(), &epoch_bucket.to_be_bytes()],
    )
}

pub fn quota_epoch_key() -> Hash {
    namespaced(b"quota_epoch", &[])
}

pub fn swap_voucher_key(id: &[u8; 32]) -> Hash {
    namespaced(b"swap_voucher", &[id])
}

/// Fixed, human-chosen key for a named index registry (a sorted list of
/// identifiers the trie itself cannot enumerate).
pub fn index_key(name: &[u8]) -> Hash {
    namespaced(b"index", &[name])
}

pub fn reward_index_key() -> Hash {
    namespaced(b"reward_index", &[])
}

pub fn epoch_accrual_key(epoch: u64) -> Hash {
    namespaced(b"epoch_accrual", &[&epoch.to_be_bytes()])
}

pub fn minted_key(token: &str) -> Hash {
    namespaced(b"minted", &[token.as_bytes()])
}

pub fn current_epoch_key() -> Hash {
    namespaced(b"current_epoch", &[])
}

pub fn last_claimed_index_key(address: &Address) -> Hash {
    namespaced(b"last_claimed_index", &[address.as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn different_namespaces_never_collide_for_same_bytes() {
        let addr = Address::ZERO;
        assert_ne!(account_key(&addr), alias_owner_key(&addr));
    }

    #[test]
    fn account_key_is_deterministic() {
        let addr = Address::ZERO;
        assert_eq!(account_key(&addr), account_key(&addr));
    }
}
