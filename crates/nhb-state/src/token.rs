//! Token registry. Symbols are case-normalized on every read/write; `NHB`
//! and `ZNHB` are always resolvable even before an explicit `register_token`
//! call, mirroring the "always present" native-token guarantee.

use nhb_trie::TrieDb;
use serde::{Deserialize, Serialize};
use shared_types::{Address, TokenMeta};

use crate::account::normalize_symbol;
use crate::errors::{Result, StateError};
use crate::keys;
use crate::state::State;

/// Display name and mint authority: the admin-facing fields of the
/// registry entry that sit alongside `TokenMeta`'s settlement fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAdmin {
    pub name: String,
    pub mint_authority: Option<Address>,
}

fn admin_key(symbol: &str) -> shared_types::Hash {
    keys::index_key(format!("token_admin:{symbol}").as_bytes())
}

impl<D: TrieDb + Clone> State<D> {
    pub fn register_token(
        &mut self,
        symbol: &str,
        name: String,
        decimals: u8,
        mint_authority: Option<Address>,
    ) -> Result<()> {
        let symbol = normalize_symbol(symbol);
        if self.get::<TokenMeta>(&keys::token_key(&symbol)).is_some() {
            return Err(StateError::TokenAlreadyRegistered(symbol));
        }
        if decimals > 18 {
            return Err(StateError::InvalidDecimals(decimals));
        }
        let meta = TokenMeta {
            symbol: symbol.clone(),
            decimals,
            total_supply: shared_types::Amount::zero(),
            emission_cap: None,
        };
        self.put(keys::token_key(&symbol), &meta);
        self.put(admin_key(&symbol), &TokenAdmin { name, mint_authority });
        self.index_insert(keys::index_key(keys::TOKEN_INDEX_KEY), symbol);
        Ok(())
    }

    pub fn get_token_admin(&self, symbol: &str) -> Option<TokenAdmin> {
        self.get(&admin_key(&normalize_symbol(symbol)))
    }

    pub fn set_token_mint_authority(&mut self, symbol: &str, mint_authority: Option<Address>) -> Result<()> {
        let symbol = normalize_symbol(symbol);
        let mut admin = self
            .get_token_admin(&symbol)
            .ok_or_else(|| StateError::TokenNotFound(symbol.clone()))?;
        admin.mint_authority = mint_authority;
        self.put(admin_key(&symbol), &admin);
        Ok(())
    }

    pub fn get_token(&self, symbol: &str) -> Option<TokenMeta> {
        let symbol = normalize_symbol(symbol);
        let stored = self.get::<TokenMeta>(&keys::token_key(&symbol));
        stored.or_else(|| native_token_default(&symbol))
    }

    /// Bumps the registry's tracked `total_supply`, e.g. for genesis
    /// allocations or a validated mint. Callers own the invariant that this
    /// always moves in lockstep with the balances it backs.
    pub fn credit_token_supply(&mut self, symbol: &str, amount: shared_types::Amount) -> Result<()> {
        let symbol = normalize_symbol(symbol);
        let mut meta = self
            .get_token(&symbol)
            .ok_or_else(|| StateError::TokenNotFound(symbol.clone()))?;
        meta.total_supply += amount;
        self.put(keys::token_key(&symbol), &meta);
        Ok(())
    }

    pub fn set_token_mint_paused(&mut self, symbol: &str, paused: bool) -> Result<()> {
        let symbol = normalize_symbol(symbol);
        self.get_token(&symbol)
            .ok_or_else(|| StateError::TokenNotFound(symbol.clone()))?;
        let flag_key = keys::index_key(format!("token_paused:{symbol}").as_bytes());
        if paused {
            self.put(flag_key, &true);
        } else {
            self.remove(flag_key);
        }
        Ok(())
    }

    pub fn is_mint_paused(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        let flag_key = keys::index_key(format!("token_paused:{symbol}").as_bytes());
        self.get::<bool>(&flag_key).unwrap_or(false)
    }

    pub fn registered_tokens(&self) -> Vec<String> {
        self.index_list(keys::index_key(keys::TOKEN_INDEX_KEY))
    }
}

fn native_token_default(symbol: &str) -> Option<TokenMeta> {
    match symbol {
        "NHB" | "ZNHB" => Some(TokenMeta {
            symbol: symbol.to_string(),
            decimals: 18,
            total_supply: shared_types::Amount::zero(),
            emission_cap: None,
        }),
        _ => None,
    }
}
