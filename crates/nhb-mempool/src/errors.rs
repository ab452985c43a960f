//! Mempool error types.

use shared_types::{Address, Hash};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MempoolError {
    #[error("mempool full at {limit} entries")]
    Full { limit: usize },

    #[error("duplicate transaction: sender={sender:?} nonce={nonce} hash={hash:?}")]
    Duplicate {
        sender: Address,
        nonce: u64,
        hash: Hash,
    },

    #[error("transaction not found: {0:?}")]
    NotFound(Hash),

    #[error("simulation rejected transaction: {0}")]
    SimulationRejected(String),

    #[error("a proposal is already in flight")]
    ProposalInFlight,

    #[error("no proposal is in flight to commit or roll back")]
    NoProposalInFlight,
}

pub type Result<T> = std::result::Result<T, MempoolError>;
