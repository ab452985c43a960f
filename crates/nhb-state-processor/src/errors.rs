//! Errors surfaced by block application (§4.6) and reward accrual (§4.4).
//! Every variant maps to one of the typed rejection reasons named in the
//! spec's narrative; none of these ever becomes a panic.

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("chain mismatch")]
    ChainMismatch,

    #[error("bad signature: {0}")]
    BadSignature(#[from] nhb_signature::SignatureError),

    #[error("nonce mismatch: expected {expected}, got {got}")]
    NonceMismatch { expected: u64, got: u64 },

    #[error("insufficient funds for gas")]
    InsufficientFundsForGas,

    #[error("sponsorship rejected: {0}")]
    SponsorshipRejected(String),

    #[error("quota exceeded for module {module}")]
    QuotaExceeded { module: String },

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("transaction has no recipient")]
    MissingRecipient,

    #[error("caller is not a registered validator")]
    UnknownValidator,

    #[error("no stake delegated")]
    NothingStaked,

    #[error("no rewards accrued")]
    NoRewards,

    #[error("emission cap already exceeded: minted {minted} > global cap {cap}")]
    EmissionCapExceeded { minted: String, cap: String },

    #[error("merchant sponsorship paused")]
    MerchantPaused,

    #[error("device sponsorship revoked")]
    DeviceRevoked,

    #[error("device {device} is bound to merchant {bound}, not {requested}")]
    DeviceMerchantMismatch {
        device: String,
        bound: String,
        requested: String,
    },

    #[error("invalid epoch config: {0}")]
    InvalidEpochConfig(String),

    #[error("malformed transaction payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    State(#[from] nhb_state::StateError),

    #[error(transparent)]
    Trie(#[from] nhb_trie::TrieError),
}

pub type Result<T> = std::result::Result<T, ProcessorError>;
