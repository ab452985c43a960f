//! Errors surfaced by sender/paymaster recovery.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("sender signature invalid: {0}")]
    InvalidSender(#[from] shared_crypto::CryptoError),

    #[error("paymaster co-signature invalid: {0}")]
    InvalidPaymaster(shared_crypto::CryptoError),
}

pub type Result<T> = std::result::Result<T, SignatureError>;
