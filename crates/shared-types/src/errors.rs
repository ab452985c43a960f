//! Node-wide error sentinels.
//!
//! Each crate defines its own domain error enum (`thiserror`, per the
//! teacher's convention); this module only holds the handful of error
//! shapes and the operational state enum shared across crate boundaries.

use crate::Address;
use thiserror::Error;

/// Errors common to every component that resolves an address to state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountError {
    /// No account exists at this address (reads default to the zero account
    /// instead of erroring; this variant is for operations that require an
    /// account to already be registered, e.g. validator lookups).
    #[error("account not found: {0}")]
    NotFound(Address),

    /// A debit would take a balance below zero.
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance {
        /// Amount the operation needed, in decimal string form.
        required: String,
        /// Amount actually available.
        available: String,
    },

    /// The transaction's nonce did not match the account's expected next nonce.
    #[error("invalid nonce: expected {expected}, got {actual}")]
    InvalidNonce {
        /// Nonce the account expected.
        expected: u64,
        /// Nonce the transaction carried.
        actual: u64,
    },
}

/// Coarse node operational state, surfaced on health/status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Normal operation: accepting transactions, producing/committing blocks.
    Running,
    /// Catching up with a peer before rejoining normal operation.
    Syncing,
    /// Halted pending operator intervention (e.g. unrecoverable state root
    /// mismatch). The node does not attempt to self-heal from this state.
    HaltedAwaitingIntervention,
}
