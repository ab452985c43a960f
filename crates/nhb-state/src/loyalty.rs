//! Loyalty programs. The spec's body only names the event surface
//! (`loyalty.program.created/updated/paused/resumed`,
//! `loyalty.paymaster.rotated`); the entity shape here is the minimal one
//! that surface implies — CRUD plus pause/resume plus sponsoring-paymaster
//! rotation, mirroring the paymaster/POS registries' file-per-concern shape.

use nhb_trie::TrieDb;
use serde::{Deserialize, Serialize};
use shared_types::Address;

use crate::errors::{Result, StateError};
use crate::keys;
use crate::state::State;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyProgram {
    pub program_id: String,
    pub owner: Address,
    pub paymaster: Option<Address>,
    pub paused: bool,
}

impl<D: TrieDb + Clone> State<D> {
    pub fn get_loyalty_program(&self, program_id: &str) -> Option<LoyaltyProgram> {
        self.get(&keys::loyalty_program_key(program_id))
    }

    pub fn create_loyalty_program(&mut self, program_id: &str, owner: Address) -> Result<()> {
        if self.get_loyalty_program(program_id).is_some() {
            return Err(StateError::TokenAlreadyRegistered(program_id.to_string()));
        }
        let program = LoyaltyProgram {
            program_id: program_id.to_string(),
            owner,
            paymaster: None,
            paused: false,
        };
        self.put(keys::loyalty_program_key(program_id), &program);
        Ok(())
    }

    pub fn set_loyalty_program_paused(&mut self, program_id: &str, paused: bool) -> Result<()> {
        let mut program = self
            .get_loyalty_program(program_id)
            .ok_or_else(|| StateError::TokenNotFound(program_id.to_string()))?;
        program.paused = paused;
        self.put(keys::loyalty_program_key(program_id), &program);
        Ok(())
    }

    pub fn rotate_loyalty_paymaster(
        &mut self,
        program_id: &str,
        new_paymaster: Address,
    ) -> Result<()> {
        let mut program = self
            .get_loyalty_program(program_id)
            .ok_or_else(|| StateError::TokenNotFound(program_id.to_string()))?;
        program.paymaster = Some(new_paymaster);
        self.put(keys::loyalty_program_key(program_id), &program);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhb_trie::MemoryTrieDb;

    #[test]
    fn create_then_pause_and_resume() {
        let mut state = State::<MemoryTrieDb>::new();
        let owner = Address([0x01; 20]);
        state.create_loyalty_program("gold", owner).unwrap();
        assert!(!state.get_loyalty_program("gold").unwrap().paused);
        state.set_loyalty_program_paused("gold", true).unwrap();
        assert!(state.get_loyalty_program("gold").unwrap().paused);
        state.set_loyalty_program_paused("gold", false).unwrap();
        assert!(!state.get_loyalty_program("gold").unwrap().paused);
    }

    #[test]
    fn rotate_paymaster_sets_new_sponsor() {
        let mut state = State::<MemoryTrieDb>::new();
        state.create_loyalty_program("gold", Address([0x01; 20])).unwrap();
        let paymaster = Address([0x02; 20]);
        state.rotate_loyalty_paymaster("gold", paymaster).unwrap();
        assert_eq!(state.get_loyalty_program("gold").unwrap().paymaster, Some(paymaster));
    }
}
