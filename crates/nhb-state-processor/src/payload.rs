//! Type-specific transaction payloads. `Transaction::data` is
//! bincode-encoded per `tx_type`, per shared-types' own doc comment on the
//! field; this module names the shape for each operation kind that carries
//! one (a few, like `Transfer`/`Heartbeat`, need no payload beyond the
//! envelope itself).

use serde::{Deserialize, Serialize};
use shared_types::{Address, Amount, Hash};

use crate::errors::{ProcessorError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DelegatePayload {
    pub validator: Address,
    pub amount: Amount,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UndelegatePayload {
    pub amount: Amount,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterValidatorPayload {
    pub moniker: String,
    pub pubkey: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SetAliasPayload {
    /// Empty clears the sender's alias; otherwise the alias to adopt.
    pub alias: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PosAuthorizePayload {
    pub merchant_id: String,
    pub device_id: Option<String>,
    pub amount: Amount,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateClaimablePayload {
    pub id: Hash,
    pub token: String,
    pub amount: Amount,
    pub hash_lock: Hash,
    pub recipient_hint: Hash,
    pub deadline: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedeemClaimablePayload {
    pub id: Hash,
    pub preimage: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CancelClaimablePayload {
    pub id: Hash,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinLoyaltyProgramPayload {
    pub program_id: String,
}

pub fn decode<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
    bincode::deserialize(data).map_err(|e| ProcessorError::MalformedPayload(e.to_string()))
}
