//! Errors surfaced by handshake verification, framing and dialing (§4.9).

#[derive(Debug, thiserror::Error)]
pub enum P2pError {
    #[error("handshake chain id mismatch: ours {ours}, theirs {theirs}")]
    ChainMismatch { ours: u64, theirs: u64 },

    #[error("handshake genesis hash mismatch")]
    GenesisMismatch,

    #[error("handshake signature invalid: {0}")]
    BadSignature(#[source] shared_crypto::CryptoError),

    #[error("handshake signature recovers a different node id than claimed")]
    NodeIdMismatch,

    #[error("handshake timestamp {timestamp} outside allowed skew of {skew_secs}s")]
    TimestampSkew { timestamp: u64, skew_secs: u64 },

    #[error("handshake nonce already observed (replay)")]
    ReplayedNonce,

    #[error("handshake payload of {got} bytes exceeds max_message_bytes of {max}")]
    OversizedHandshake { got: usize, max: usize },

    #[error("message of {got} bytes exceeds max_message_bytes of {max}")]
    OversizedMessage { got: usize, max: usize },

    #[error("peer exceeded its rate-limit burst")]
    RateLimited,

    #[error("peer {0:?} is currently banned")]
    Banned([u8; 32]),

    #[error("expected a handshake as the first message on a new connection")]
    ExpectedHandshake,

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    IllegalTransition(#[from] crate::connection::IllegalTransition),
}

pub type Result<T> = std::result::Result<T, P2pError>;
