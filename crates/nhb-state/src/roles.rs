//! Role membership: a named set of addresses, kept sorted for deterministic
//! iteration (validator onboarding, paymaster auto-topup approver checks).

use nhb_trie::TrieDb;
use shared_types::Address;

use crate::keys;
use crate::state::State;

impl<D: TrieDb + Clone> State<D> {
    pub fn set_role(&mut self, role: &str, address: Address, member: bool) {
        let mut members = self.role_members(role);
        match members.binary_search(&address) {
            Ok(pos) if !member => {
                members.remove(pos);
            }
            Err(pos) if member => {
                members.insert(pos, address);
            }
            _ => {}
        }
        self.put(keys::role_key(role), &members);
    }

    pub fn role_members(&self, role: &str) -> Vec<Address> {
        self.get(&keys::role_key(role)).unwrap_or_default()
    }

    pub fn has_role(&self, role: &str, address: &Address) -> bool {
        self.role_members(role).binary_search(address).is_ok()
    }
}
