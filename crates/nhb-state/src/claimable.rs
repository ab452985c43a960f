//! Hash-locked claimable escrow (§4.10).

use nhb_trie::TrieDb;
use serde::{Deserialize, Serialize};
use shared_crypto::keccak256;
use shared_types::{Address, Amount, Hash};

use crate::errors::{Result, StateError};
use crate::keys;
use crate::state::State;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimableStatus {
    Init,
    Claimed,
    Cancelled,
    Expired,
}

impl std::fmt::Display for ClaimableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClaimableStatus::Init => "Init",
            ClaimableStatus::Claimed => "Claimed",
            ClaimableStatus::Cancelled => "Cancelled",
            ClaimableStatus::Expired => "Expired",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claimable {
    pub id: Hash,
    pub payer: Address,
    pub token: String,
    pub amount: Amount,
    pub hash_lock: Hash,
    pub recipient_hint: Hash,
    pub deadline: u64,
    pub created_at: u64,
    pub status: ClaimableStatus,
}

impl<D: TrieDb + Clone> State<D> {
    pub fn get_claimable(&self, id: &Hash) -> Option<Claimable> {
        self.get(&keys::claimable_key(id))
    }

    /// Debits the payer and stores the claimable in `Init`. The caller is
    /// responsible for crediting the escrow account if one is used; here the
    /// amount is simply removed from the payer's spendable balance.
    pub fn create_claimable(
        &mut self,
        id: Hash,
        payer: Address,
        token: &str,
        amount: Amount,
        hash_lock: Hash,
        recipient_hint: Hash,
        deadline: u64,
        now: u64,
    ) -> Result<()> {
        if amount.is_zero() {
            return Err(StateError::NonPositiveAmount);
        }
        if deadline <= now {
            return Err(StateError::DeadlineInPast);
        }
        self.get_token(token)
            .ok_or_else(|| StateError::TokenNotFound(token.to_string()))?;

        let claimable = Claimable {
            id,
            payer,
            token: token.to_string(),
            amount,
            hash_lock,
            recipient_hint,
            deadline,
            created_at: now,
            status: ClaimableStatus::Init,
        };
        self.put(keys::claimable_key(&id), &claimable);
        self.index_insert(
            keys::index_key(keys::CLAIMABLE_INDEX_KEY),
            hex::encode(id),
        );
        Ok(())
    }

    pub fn claim_claimable(&mut self, id: &Hash, preimage: &[u8], now: u64) -> Result<Claimable> {
        let mut claimable = self.get_claimable(id).ok_or(StateError::ClaimableNotFound)?;
        if !matches!(claimable.status, ClaimableStatus::Init) {
            return Err(StateError::ClaimableWrongState {
                status: claimable.status.to_string(),
            });
        }
        if now > claimable.deadline {
            return Err(StateError::ClaimableExpired);
        }
        if keccak256(preimage) != claimable.hash_lock {
            return Err(StateError::HashLockMismatch);
        }
        claimable.status = ClaimableStatus::Claimed;
        self.put(keys::claimable_key(id), &claimable);
        Ok(claimable)
    }

    pub fn cancel_claimable(&mut self, id: &Hash, caller: &Address) -> Result<Claimable> {
        let mut claimable = self.get_claimable(id).ok_or(StateError::ClaimableNotFound)?;
        if claimable.payer != *caller {
            return Err(StateError::NotPayer);
        }
        if !matches!(claimable.status, ClaimableStatus::Init) {
            return Err(StateError::ClaimableWrongState {
                status: claimable.status.to_string(),
            });
        }
        claimable.status = ClaimableStatus::Cancelled;
        self.put(keys::claimable_key(id), &claimable);
        Ok(claimable)
    }

    /// Called from `BeginBlock`: expires every `Init` claimable past its
    /// deadline, returning the ones swept so the caller can refund payers
    /// and emit `claimable.expired` events.
    pub fn expire_sweep(&mut self, now: u64) -> Vec<Claimable> {
        let mut expired = Vec::new();
        for hex_id in self.index_list(keys::index_key(keys::CLAIMABLE_INDEX_KEY)) {
            let Ok(raw) = hex::decode(&hex_id) else {
                continue;
            };
            let Ok(id): std::result::Result<Hash, _> = raw.try_into() else {
                continue;
            };
            if let Some(mut claimable) = self.get_claimable(&id) {
                if matches!(claimable.status, ClaimableStatus::Init) && claimable.deadline < now {
                    claimable.status = ClaimableStatus::Expired;
                    self.put(keys::claimable_key(&id), &claimable);
                    expired.push(claimable);
                }
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhb_trie::MemoryTrieDb;

    fn id(byte: u8) -> Hash {
        [byte; 32]
    }

    #[test]
    fn create_claim_round_trip() {
        let mut state = State::<MemoryTrieDb>::new();
        let payer = Address([0x01; 20]);
        let preimage = b"secret";
        let hash_lock = keccak256(preimage);
        state
            .create_claimable(id(1), payer, "NHB", Amount::from(100u64), hash_lock, [0; 32], 1000, 1)
            .unwrap();

        let claimed = state.claim_claimable(&id(1), preimage, 500).unwrap();
        assert_eq!(claimed.status, ClaimableStatus::Claimed);
    }

    #[test]
    fn wrong_preimage_rejected() {
        let mut state = State::<MemoryTrieDb>::new();
        let payer = Address([0x01; 20]);
        let hash_lock = keccak256(b"secret");
        state
            .create_claimable(id(2), payer, "NHB", Amount::from(100u64), hash_lock, [0; 32], 1000, 1)
            .unwrap();
        let err = state.claim_claimable(&id(2), b"wrong", 500).unwrap_err();
        assert_eq!(err, StateError::HashLockMismatch);
    }

    #[test]
    fn only_payer_can_cancel() {
        let mut state = State::<MemoryTrieDb>::new();
        let payer = Address([0x01; 20]);
        let other = Address([0x02; 20]);
        state
            .create_claimable(id(3), payer, "NHB", Amount::from(100u64), [0; 32], [0; 32], 1000, 1)
            .unwrap();
        assert_eq!(
            state.cancel_claimable(&id(3), &other).unwrap_err(),
            StateError::NotPayer
        );
        assert_eq!(
            state.cancel_claimable(&id(3), &payer).unwrap().status,
            ClaimableStatus::Cancelled
        );
    }

    #[test]
    fn expire_sweep_only_touches_init_past_deadline() {
        let mut state = State::<MemoryTrieDb>::new();
        let payer = Address([0x01; 20]);
        state
            .create_claimable(id(4), payer, "NHB", Amount::from(1u64), [0; 32], [0; 32], 100, 1)
            .unwrap();
        state
            .create_claimable(id(5), payer, "NHB", Amount::from(1u64), [0; 32], [0; 32], 9999, 1)
            .unwrap();

        let expired = state.expire_sweep(200);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, id(4));
        assert_eq!(
            state.get_claimable(&id(5)).unwrap().status,
            ClaimableStatus::Init
        );
    }
}
