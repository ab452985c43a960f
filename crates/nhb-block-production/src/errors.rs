//! Errors surfaced by block assembly and `CommitBlock` (§4.8). None of these
//! leave the trie or mempool in a half-applied state — every variant is
//! raised after the caller has already reset/rolled back.

#[derive(Debug, thiserror::Error)]
pub enum BlockProductionError {
    #[error("header height {got} does not follow current height {expected}")]
    HeightMismatch { expected: u64, got: u64 },

    #[error("header parent hash does not match the chain tip")]
    ParentMismatch,

    #[error("proposing validator is not a member of the current validator set")]
    UnknownProposer,

    #[error("transaction root mismatch: header {header}, recomputed {recomputed}")]
    TxRootMismatch { header: String, recomputed: String },

    #[error("state root mismatch: header {header}, recomputed {recomputed}")]
    StateRootMismatch { header: String, recomputed: String },

    #[error(transparent)]
    Processor(#[from] nhb_state_processor::ProcessorError),

    #[error(transparent)]
    State(#[from] nhb_state::StateError),

    #[error(transparent)]
    Trie(#[from] nhb_trie::TrieError),

    #[error(transparent)]
    Mempool(#[from] nhb_mempool::MempoolError),
}

pub type Result<T> = std::result::Result<T, BlockProductionError>;
