//! Identity aliases: a human-readable name bound to a primary address plus
//! zero or more linked addresses, normalized per `^[a-z0-9._-]{3,32}$`.

use nhb_trie::TrieDb;
use serde::{Deserialize, Serialize};
use shared_types::Address;

use crate::errors::{Result, StateError};
use crate::keys;
use crate::state::State;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecord {
    pub alias: String,
    pub primary_address: Address,
    pub linked_addresses: Vec<Address>,
    pub avatar: Option<String>,
}

/// Normalize to lowercase and validate `^[a-z0-9._-]{3,32}$`.
pub fn normalize_alias(alias: &str) -> Result<String> {
    let normalized = alias.to_lowercase();
    let len_ok = (3..=32).contains(&normalized.len());
    let chars_ok = normalized
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
    if len_ok && chars_ok {
        Ok(normalized)
    } else {
        Err(StateError::InvalidAddress)
    }
}

/// `https://` or `blob://`, at most 512 bytes.
pub fn validate_avatar(url: &str) -> Result<()> {
    let scheme_ok = url.starts_with("https://") || url.starts_with("blob://");
    if scheme_ok && url.len() <= 512 {
        Ok(())
    } else {
        Err(StateError::InvalidAddress)
    }
}

impl<D: TrieDb + Clone> State<D> {
    pub fn get_alias(&self, alias: &str) -> Option<AliasRecord> {
        let alias = alias.to_lowercase();
        self.get(&keys::alias_key(&alias))
    }

    pub fn alias_for_address(&self, address: &Address) -> Option<String> {
        self.get(&keys::alias_owner_key(address))
    }

    pub fn set_alias(&mut self, address: Address, alias: &str) -> Result<()> {
        let alias = normalize_alias(alias)?;
        if self.get_alias(&alias).is_some() {
            return Err(StateError::AliasTaken(alias));
        }
        if self.alias_for_address(&address).is_some() {
            return Err(StateError::AddressLinked);
        }
        let record = AliasRecord {
            alias: alias.clone(),
            primary_address: address,
            linked_addresses: vec![address],
            avatar: None,
        };
        self.put(keys::alias_key(&alias), &record);
        self.put(keys::alias_owner_key(&address), &alias);
        Ok(())
    }

    pub fn link_address(&mut self, alias: &str, address: Address) -> Result<()> {
        let alias = alias.to_lowercase();
        let mut record = self
            .get_alias(&alias)
            .ok_or_else(|| StateError::AliasNotFound(alias.clone()))?;
        if self.alias_for_address(&address).is_some() {
            return Err(StateError::AddressLinked);
        }
        record.linked_addresses.push(address);
        self.put(keys::alias_key(&alias), &record);
        self.put(keys::alias_owner_key(&address), &alias);
        Ok(())
    }

    pub fn remove_address(&mut self, alias: &str, address: &Address) -> Result<()> {
        let alias = alias.to_lowercase();
        let mut record = self
            .get_alias(&alias)
            .ok_or_else(|| StateError::AliasNotFound(alias.clone()))?;
        if record.primary_address == *address && record.linked_addresses.len() == 1 {
            return Err(StateError::PrimaryAddressRequired);
        }
        record.linked_addresses.retain(|a| a != address);
        if record.primary_address == *address {
            record.primary_address = record.linked_addresses[0];
        }
        self.remove(keys::alias_owner_key(address));
        self.put(keys::alias_key(&alias), &record);
        Ok(())
    }

    pub fn set_primary_address(
        &mut self,
        alias: &str,
        caller: &Address,
        new_primary: Address,
    ) -> Result<()> {
        let alias = alias.to_lowercase();
        let mut record = self
            .get_alias(&alias)
            .ok_or_else(|| StateError::AliasNotFound(alias.clone()))?;
        if record.primary_address != *caller {
            return Err(StateError::NotAliasOwner);
        }
        if !record.linked_addresses.contains(&new_primary) {
            return Err(StateError::AddressLinked);
        }
        record.primary_address = new_primary;
        self.put(keys::alias_key(&alias), &record);
        Ok(())
    }

    pub fn set_avatar(&mut self, alias: &str, caller: &Address, avatar_url: &str) -> Result<()> {
        validate_avatar(avatar_url)?;
        let alias = alias.to_lowercase();
        let mut record = self
            .get_alias(&alias)
            .ok_or_else(|| StateError::AliasNotFound(alias.clone()))?;
        if record.primary_address != *caller {
            return Err(StateError::NotAliasOwner);
        }
        record.avatar = Some(avatar_url.to_string());
        self.put(keys::alias_key(&alias), &record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhb_trie::MemoryTrieDb;

    #[test]
    fn normalize_rejects_too_short_and_bad_chars() {
        assert!(normalize_alias("ab").is_err());
        assert!(normalize_alias("Has Space").is_err());
        assert!(normalize_alias("ALICE").is_ok());
    }

    #[test]
    fn set_alias_then_lookup_both_directions() {
        let mut state = State::<MemoryTrieDb>::new();
        let addr = Address([0x01; 20]);
        state.set_alias(addr, "Alice").unwrap();
        assert_eq!(state.get_alias("alice").unwrap().primary_address, addr);
        assert_eq!(state.alias_for_address(&addr), Some("alice".to_string()));
    }

    #[test]
    fn duplicate_alias_rejected() {
        let mut state = State::<MemoryTrieDb>::new();
        state.set_alias(Address([0x01; 20]), "alice").unwrap();
        let err = state.set_alias(Address([0x02; 20]), "alice").unwrap_err();
        assert_eq!(err, StateError::AliasTaken("alice".to_string()));
    }

    #[test]
    fn address_already_linked_rejected() {
        let mut state = State::<MemoryTrieDb>::new();
        let addr = Address([0x01; 20]);
        state.set_alias(addr, "alice").unwrap();
        let err = state.set_alias(addr, "alice2").unwrap_err();
        assert_eq!(err, StateError::AddressLinked);
    }

    #[test]
    fn removing_sole_primary_address_fails() {
        let mut state = State::<MemoryTrieDb>::new();
        let addr = Address([0x01; 20]);
        state.set_alias(addr, "alice").unwrap();
        let err = state.remove_address("alice", &addr).unwrap_err();
        assert_eq!(err, StateError::PrimaryAddressRequired);
    }

    #[test]
    fn link_then_remove_non_primary_succeeds() {
        let mut state = State::<MemoryTrieDb>::new();
        let primary = Address([0x01; 20]);
        let linked = Address([0x02; 20]);
        state.set_alias(primary, "alice").unwrap();
        state.link_address("alice", linked).unwrap();
        state.remove_address("alice", &linked).unwrap();
        assert_eq!(state.alias_for_address(&linked), None);
    }

    #[test]
    fn avatar_must_use_allowed_scheme() {
        assert!(validate_avatar("https://example.com/a.png").is_ok());
        assert!(validate_avatar("blob://abc").is_ok());
        assert!(validate_avatar("http://example.com/a.png").is_err());
    }
}
