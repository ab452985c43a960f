//! # Core domain entities
//!
//! The data model every crate in the node shares: addresses, the two-token
//! account, transactions, blocks, and the event a block emits while applying.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// ADDRESSES
// =============================================================================

/// A 32-byte hash (Keccak256 output, trie root, tx digest, block hash, ...).
pub type Hash = [u8; 32];

/// 20-byte account address. Comparisons are always plain byte comparisons;
/// the `nhb`/`znhb` human-readable prefix exists only at the encoding
/// boundary (`shared_crypto::bech32`), never as part of this type's identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address, used as a sentinel for "no delegate"/"no paymaster".
    pub const ZERO: Address = Address([0u8; 20]);

    /// Derive an address from an uncompressed secp256k1 public key.
    pub fn from_public_key(pubkey_uncompressed: &[u8]) -> Self {
        Address(shared_crypto::keccak256(&pubkey_uncompressed[1..])[12..].try_into().unwrap())
    }

    /// Encode under the NHB-denominated prefix.
    pub fn to_bech32_nhb(self) -> String {
        shared_crypto::bech32::encode(shared_crypto::bech32::Hrp::Nhb, &self.0)
    }

    /// Encode under the ZNHB-denominated prefix.
    pub fn to_bech32_znhb(self) -> String {
        shared_crypto::bech32::encode(shared_crypto::bech32::Hrp::Znhb, &self.0)
    }

    /// Decode either prefix, returning the 20-byte address regardless of which
    /// token's namespace it was presented in — both name the same account.
    pub fn from_bech32_any(s: &str) -> Result<Self, shared_crypto::CryptoError> {
        shared_crypto::bech32::decode_any(s).map(|(_, bytes)| Address(bytes))
    }

    /// Raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_bech32_nhb())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bech32_nhb())
    }
}

/// Chain identifier. Modeled as `u64` (see `DESIGN.md` for the "big.Integer"
/// open question); `to_be_bytes_trimmed` keeps the signed digest's encoding
/// stable if a future chain id needs to widen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Big-endian bytes with leading zero bytes stripped, matching the
    /// variable-length integer encoding used in the transaction digest.
    pub fn to_be_bytes_trimmed(self) -> Vec<u8> {
        let full = self.0.to_be_bytes();
        let first_nonzero = full.iter().position(|&b| b != 0).unwrap_or(7);
        full[first_nonzero..].to_vec()
    }
}

// =============================================================================
// ACCOUNT
// =============================================================================

/// A native-token amount. Unbounded and non-negative: never mixed with
/// signed native integers, always compared/added via `U256` arithmetic.
pub type Amount = U256;

/// A validator unbonding in progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUnbond {
    /// ZNHB amount being released.
    pub amount: Amount,
    /// Height at which the amount becomes spendable.
    pub release_height: u64,
}

/// Per-address account state: nonce, both token balances, stake and
/// delegation bookkeeping, identity alias and engagement score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Next expected transaction nonce.
    pub nonce: u64,
    /// Spendable NHB balance.
    pub balance_nhb: Amount,
    /// Spendable ZNHB balance.
    pub balance_znhb: Amount,
    /// ZNHB actively staked (bonded) by this account.
    pub stake: Amount,
    /// ZNHB locked pending unbonding.
    pub locked_znhb: Amount,
    /// This account's share of the global stake-reward index pool.
    pub stake_shares: Amount,
    /// Collateral posted for paymaster sponsorship / POS authorizations.
    pub collateral_balance: Amount,
    /// Validator this account has delegated its stake to, if any.
    pub delegated_validator: Option<Address>,
    /// Unbonding requests not yet released.
    pub pending_unbonds: Vec<PendingUnbond>,
    /// Human-readable identity alias, if registered.
    pub username: Option<String>,
    /// Accumulated engagement/loyalty score.
    pub engagement_score: u64,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance_nhb: Amount::zero(),
            balance_znhb: Amount::zero(),
            stake: Amount::zero(),
            locked_znhb: Amount::zero(),
            stake_shares: Amount::zero(),
            collateral_balance: Amount::zero(),
            delegated_validator: None,
            pending_unbonds: Vec::new(),
            username: None,
            engagement_score: 0,
        }
    }
}

// =============================================================================
// TOKEN REGISTRY
// =============================================================================

/// Metadata describing a native token's supply bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeta {
    /// Ticker symbol (`"NHB"` or `"ZNHB"`).
    pub symbol: String,
    /// Decimal places.
    pub decimals: u8,
    /// Circulating supply tracked by the state manager.
    pub total_supply: Amount,
    /// Hard emission cap, if one applies to this token.
    pub emission_cap: Option<Amount>,
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// The operation a transaction performs. `Data` carries the type-specific
/// payload (bincode-encoded), keeping the envelope itself uniform the way a
/// dynamically dispatched tagged variant would in a dynamically typed host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TxType {
    /// Plain NHB/ZNHB transfer.
    Transfer = 0,
    /// Bond ZNHB to a validator.
    Delegate = 1,
    /// Begin unbonding previously delegated ZNHB.
    Undelegate = 2,
    /// Claim accrued staking rewards.
    ClaimRewards = 3,
    /// Register (or update) this account as a validator candidate.
    RegisterValidator = 4,
    /// Set or clear this account's identity alias.
    SetAlias = 5,
    /// Record a POS payment authorization.
    PosAuthorize = 6,
    /// Create a hash-locked claimable payment.
    CreateClaimable = 7,
    /// Redeem a claimable payment with its preimage.
    RedeemClaimable = 8,
    /// Join a loyalty program.
    JoinLoyaltyProgram = 9,
    /// Plain ZNHB transfer (distinct from delegation, which bonds rather
    /// than moves ownership).
    TransferZNHB = 10,
    /// Liveness ping that bumps the sender's engagement score.
    Heartbeat = 11,
    /// Cancel a hash-locked claimable still in `Init`, refunding its payer.
    CancelClaimable = 12,
}

/// A signed transaction, optionally co-signed by a paymaster sponsoring gas.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    /// Chain this transaction targets; rejected if it doesn't match genesis.
    pub chain_id: ChainId,
    /// Operation kind.
    pub tx_type: TxType,
    /// Sender's expected next nonce.
    pub nonce: u64,
    /// Recipient, when the operation has one.
    pub to: Option<Address>,
    /// Value transferred (native-token operations) or zero.
    pub value: Amount,
    /// Maximum gas this transaction may consume.
    pub gas_limit: u64,
    /// Gas price offered, in NHB base units.
    pub gas_price: Amount,
    /// Type-specific payload.
    pub data: Vec<u8>,
    /// Paymaster sponsoring gas for this transaction, if any.
    pub paymaster: Option<Address>,
    /// Paymaster's co-signature authorizing sponsorship.
    pub paymaster_signature: Option<shared_crypto::Secp256k1Signature>,
    /// Sender's signature over the transaction digest.
    pub signature: shared_crypto::Secp256k1Signature,
    /// For POS authorizations: the merchant address being paid.
    pub merchant_address: Option<Address>,
}

impl Transaction {
    /// RLP-like deterministic encoding of every field but the sender
    /// signature, hashed with Keccak256 to produce the digest that is
    /// signed and later used as the transaction's id.
    pub fn signing_digest(&self) -> Hash {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.chain_id.to_be_bytes_trimmed());
        buf.push(self.tx_type as u8);
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        if let Some(to) = self.to {
            buf.extend_from_slice(&to.0);
        }
        buf.extend_from_slice(&encode_u256(self.value));
        buf.extend_from_slice(&self.gas_limit.to_be_bytes());
        buf.extend_from_slice(&encode_u256(self.gas_price));
        buf.extend_from_slice(&self.data);
        if let Some(paymaster) = self.paymaster {
            buf.extend_from_slice(&paymaster.0);
        }
        if let Some(merchant) = self.merchant_address {
            buf.extend_from_slice(&merchant.0);
        }
        shared_crypto::keccak256(&buf)
    }

    /// Transaction hash — the signing digest folded with the sender's
    /// signature, so two accounts never collide on the same hash even if
    /// every other field matches (e.g. identical zero-value pings).
    pub fn hash(&self) -> Hash {
        shared_crypto::keccak256_many(&[&self.signing_digest(), &self.signature.to_bytes()])
    }

    /// Recover and return the sender address, validating the signature.
    pub fn recover_sender(&self) -> Result<Address, shared_crypto::CryptoError> {
        let digest = self.signing_digest();
        self.signature.recover(&digest).map(Address)
    }

    /// Recover and validate the paymaster's co-signature, if present.
    pub fn recover_paymaster(&self) -> Option<Result<Address, shared_crypto::CryptoError>> {
        let (paymaster, sig) = (self.paymaster?, self.paymaster_signature?);
        let digest = self.signing_digest();
        Some(sig.recover_expecting(&digest, paymaster.0).map(Address))
    }
}

fn encode_u256(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

// =============================================================================
// BLOCKS
// =============================================================================

/// Block header: height, timestamp, parent linkage and post-application roots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height (genesis is height 0).
    pub height: u64,
    /// Unix timestamp the proposer stamped this block with.
    pub timestamp: u64,
    /// Hash of the parent block header.
    pub prev_hash: Hash,
    /// State trie root after applying this block's transactions.
    pub state_root: Hash,
    /// Transaction trie root.
    pub tx_root: Hash,
    /// Address of the proposer who committed this block.
    pub validator: Address,
}

/// A committed block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    /// Header.
    pub header: BlockHeader,
    /// Transactions, in the exact order the proposer applied them.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Keccak256 of the header's canonical encoding.
    pub fn hash(&self) -> Hash {
        let h = &self.header;
        let mut buf = Vec::new();
        buf.extend_from_slice(&h.height.to_be_bytes());
        buf.extend_from_slice(&h.timestamp.to_be_bytes());
        buf.extend_from_slice(&h.prev_hash);
        buf.extend_from_slice(&h.state_root);
        buf.extend_from_slice(&h.tx_root);
        buf.extend_from_slice(&h.validator.0);
        shared_crypto::keccak256(&buf)
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// A single state-transition event. Attributes are plain strings so the
/// buffer can be serialized and emitted without the emitter needing to know
/// the producing subsystem's internal types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Dotted event name, e.g. `"stake.rewardsClaimed"`.
    pub event_type: String,
    /// Attribute map, iterated in sorted key order wherever it is hashed or
    /// rendered, so output is deterministic across runs.
    pub attributes: BTreeMap<String, String>,
}

impl Event {
    /// Construct an event with no attributes yet.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
