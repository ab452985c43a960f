//! Genesis specification parsing and deterministic chain construction (§6).
//!
//! Construction order is fixed so that two independent runs over the same
//! [`GenesisSpec`] produce a byte-identical state root and genesis hash:
//! native tokens sorted by upper-cased symbol, allocations outer-sorted by
//! address then inner-sorted by symbol, validators sorted by address.

use std::collections::BTreeMap;

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, Hash};
use thiserror::Error;

use nhb_state::validator_set::ValidatorEntry;
use nhb_state::State;
use nhb_trie::MemoryTrieDb;

/// Errors raised while parsing or applying a genesis specification.
#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("invalid genesis JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("genesisTime is not a valid RFC3339 timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid address {0:?} in genesis spec")]
    InvalidAddress(String),

    #[error("invalid pubKey hex for validator {0}: expected 33 compressed bytes")]
    InvalidPubkey(String),

    #[error("alloc amount {amount:?} for {addr}/{symbol} is not a valid non-negative integer")]
    InvalidAmount {
        addr: String,
        symbol: String,
        amount: String,
    },

    #[error("alloc references unregistered token {0}")]
    UnknownToken(String),

    #[error(transparent)]
    State(#[from] nhb_state::StateError),

    #[error(transparent)]
    Trie(#[from] nhb_trie::TrieError),
}

pub type Result<T> = std::result::Result<T, GenesisError>;

/// One entry of `nativeTokens` in the genesis JSON.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NativeTokenSpec {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(rename = "mintAuthority", default)]
    pub mint_authority: Option<String>,
    #[serde(rename = "initialMintPaused", default)]
    pub initial_mint_paused: bool,
}

/// One entry of `validators` in the genesis JSON.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidatorSpec {
    pub address: String,
    pub power: u64,
    pub moniker: String,
    #[serde(rename = "pubKey")]
    pub pub_key: String,
}

/// The parsed, unvalidated genesis file. Unknown fields are rejected so a
/// typo in an operator-provided file fails loudly instead of being ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisSpec {
    #[serde(rename = "genesisTime")]
    pub genesis_time: String,
    #[serde(rename = "nativeTokens")]
    pub native_tokens: Vec<NativeTokenSpec>,
    pub validators: Vec<ValidatorSpec>,
    /// `address -> symbol -> amount`, amount given as a decimal string of the
    /// token's smallest unit (no implicit `10^decimals` scaling — the file
    /// names base-unit quantities directly, the same convention the teacher's
    /// `GenesisConfig::initial_stakes` uses for wei amounts).
    pub alloc: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,
    #[serde(rename = "chainID", default)]
    pub chain_id: Option<u64>,
}

impl GenesisSpec {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// The state constructed from a genesis spec, plus the values the node
/// needs before it can start producing blocks.
pub struct GenesisOutput {
    pub state: State<MemoryTrieDb>,
    pub chain_id: ChainId,
    pub timestamp: u64,
    pub state_root: Hash,
    pub genesis_hash: Hash,
}

/// Builds genesis state from `spec`. `config_chain_id` is used only when the
/// spec itself carries no `chainID`; when both are present the spec wins, so
/// a genesis file stays self-describing once distributed to peers.
pub fn build_genesis(spec: &GenesisSpec, config_chain_id: u64) -> Result<GenesisOutput> {
    let timestamp = parse_rfc3339(&spec.genesis_time)?;
    let chain_id = ChainId(spec.chain_id.unwrap_or(config_chain_id));

    let mut state = State::<MemoryTrieDb>::new();

    let mut tokens = spec.native_tokens.clone();
    tokens.sort_by(|a, b| a.symbol.to_uppercase().cmp(&b.symbol.to_uppercase()));
    for token in &tokens {
        let mint_authority = token
            .mint_authority
            .as_deref()
            .map(parse_address)
            .transpose()?;
        state.register_token(&token.symbol, token.name.clone(), token.decimals, mint_authority)?;
        if token.initial_mint_paused {
            state.set_token_mint_paused(&token.symbol, true)?;
        }
    }

    let mut allocations: Vec<(Address, String, String)> = Vec::new();
    for (addr_str, balances) in &spec.alloc {
        let addr = parse_address(addr_str)?;
        for (symbol, amount) in balances {
            allocations.push((addr, symbol.to_uppercase(), amount.clone()));
        }
    }
    allocations.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    for (addr, symbol, amount_str) in &allocations {
        state
            .get_token(symbol)
            .ok_or_else(|| GenesisError::UnknownToken(symbol.clone()))?;
        let amount = U256::from_dec_str(amount_str).map_err(|_| GenesisError::InvalidAmount {
            addr: addr.to_bech32_nhb(),
            symbol: symbol.clone(),
            amount: amount_str.clone(),
        })?;
        let current = state.get_balance(addr, symbol);
        state.set_balance(addr, symbol, current + amount);
        state.credit_token_supply(symbol, amount)?;
    }

    let mut validators = spec.validators.clone();
    validators.sort_by(|a, b| a.address.cmp(&b.address));
    let mut entries = Vec::with_capacity(validators.len());
    for validator in &validators {
        let address = parse_address(&validator.address)?;
        let pubkey = hex::decode(validator.pub_key.trim_start_matches("0x"))
            .map_err(|_| GenesisError::InvalidPubkey(validator.moniker.clone()))?;
        if pubkey.len() != 33 {
            return Err(GenesisError::InvalidPubkey(validator.moniker.clone()));
        }
        entries.push(ValidatorEntry {
            address,
            power: validator.power,
            moniker: validator.moniker.clone(),
            pubkey,
        });
    }
    state.write_validator_set(entries);

    for (role, members) in &spec.roles {
        for member in members {
            let addr = parse_address(member)?;
            state.set_role(role, addr, true);
        }
    }

    let state_root = state.root_hash()?;
    let genesis_hash = compute_genesis_hash(chain_id, timestamp, &state_root);

    Ok(GenesisOutput {
        state,
        chain_id,
        timestamp,
        state_root,
        genesis_hash,
    })
}

fn parse_address(s: &str) -> Result<Address> {
    Address::from_bech32_any(s).map_err(|_| GenesisError::InvalidAddress(s.to_string()))
}

fn parse_rfc3339(s: &str) -> Result<u64> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp().max(0) as u64)
        .map_err(|e| GenesisError::InvalidTimestamp(e.to_string()))
}

/// Height 0 has no parent and an empty transaction root by definition; the
/// hash only needs to bind the chain id, timestamp and resulting state root.
fn compute_genesis_hash(chain_id: ChainId, timestamp: u64, state_root: &Hash) -> Hash {
    let mut buf = Vec::with_capacity(8 + 8 + 32);
    buf.extend_from_slice(&chain_id.0.to_be_bytes());
    buf.extend_from_slice(&timestamp.to_be_bytes());
    buf.extend_from_slice(state_root);
    shared_crypto::keccak256(&buf)
}
