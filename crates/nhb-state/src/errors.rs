use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("trie error: {0}")]
    Trie(#[from] nhb_trie::TrieError),

    #[error("alias already taken: {0}")]
    AliasTaken(String),
    #[error("alias not found: {0}")]
    AliasNotFound(String),
    #[error("invalid address")]
    InvalidAddress,
    #[error("address already linked to an alias")]
    AddressLinked,
    #[error("at least one primary address is required")]
    PrimaryAddressRequired,
    #[error("caller does not own this alias")]
    NotAliasOwner,

    #[error("token already registered: {0}")]
    TokenAlreadyRegistered(String),
    #[error("decimals must be <= 18, got {0}")]
    InvalidDecimals(u8),
    #[error("token not registered: {0}")]
    TokenNotFound(String),
    #[error("mint authority required for {0}")]
    MintAuthorityRequired(String),
    #[error("minting paused for {0}")]
    MintPaused(String),

    #[error("claimable not found")]
    ClaimableNotFound,
    #[error("claimable already {status}, expected Init")]
    ClaimableWrongState { status: String },
    #[error("claimable deadline has passed")]
    ClaimableExpired,
    #[error("preimage does not match hash lock")]
    HashLockMismatch,
    #[error("only the payer may cancel a claimable")]
    NotPayer,
    #[error("claimable amount must be positive")]
    NonPositiveAmount,
    #[error("claimable deadline must be in the future")]
    DeadlineInPast,

    #[error("quota exceeded for module {module}")]
    QuotaExceeded { module: String },
}

pub type Result<T> = std::result::Result<T, StateError>;
