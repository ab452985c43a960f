//! JSON-RPC error mapping (§7): every domain error a handler can return is
//! mapped to one of the spec's eight error kinds, then to a stable
//! `{code, message}` pair the gateway serializes verbatim. Reproduced locally
//! rather than depending on the deleted gateway crate (see `DESIGN.md`).

use serde::Serialize;

/// The spec's error-kind taxonomy (§7), independent of which crate raised
/// the underlying error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Unauthorized,
    NotFound,
    Conflict,
    PreconditionFailed,
    ResourceExhausted,
    Unavailable,
    Internal,
}

/// JSON-RPC error codes for each kind, namespaced the way the teacher's
/// gateway reserves its own `-32000` server-error range.
pub mod codes {
    pub const INVALID_INPUT: i32 = -32001;
    pub const UNAUTHORIZED: i32 = -32002;
    pub const NOT_FOUND: i32 = -32003;
    pub const CONFLICT: i32 = -32004;
    pub const PRECONDITION_FAILED: i32 = -32005;
    pub const RESOURCE_EXHAUSTED: i32 = -32006;
    pub const UNAVAILABLE: i32 = -32007;
    pub const INTERNAL: i32 = -32000;
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::InvalidInput => codes::INVALID_INPUT,
            ErrorKind::Unauthorized => codes::UNAUTHORIZED,
            ErrorKind::NotFound => codes::NOT_FOUND,
            ErrorKind::Conflict => codes::CONFLICT,
            ErrorKind::PreconditionFailed => codes::PRECONDITION_FAILED,
            ErrorKind::ResourceExhausted => codes::RESOURCE_EXHAUSTED,
            ErrorKind::Unavailable => codes::UNAVAILABLE,
            ErrorKind::Internal => codes::INTERNAL,
        }
    }
}

/// The structured object surfaced to RPC callers.
#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            code: kind.code(),
            message: message.into(),
        }
    }
}

impl From<nhb_state::StateError> for RpcError {
    fn from(err: nhb_state::StateError) -> Self {
        use nhb_state::StateError::*;
        let kind = match err {
            AliasTaken(_) | TokenAlreadyRegistered(_) | AddressLinked => ErrorKind::Conflict,
            AliasNotFound(_) | ClaimableNotFound | TokenNotFound(_) => ErrorKind::NotFound,
            InvalidAddress | InvalidDecimals(_) => ErrorKind::InvalidInput,
            PrimaryAddressRequired | NotAliasOwner | NotPayer => ErrorKind::Unauthorized,
            ClaimableWrongState { .. } | ClaimableExpired | MintAuthorityRequired(_) | MintPaused(_) => {
                ErrorKind::PreconditionFailed
            }
            HashLockMismatch => ErrorKind::InvalidInput,
            NonPositiveAmount | DeadlineInPast => ErrorKind::InvalidInput,
            QuotaExceeded { .. } => ErrorKind::ResourceExhausted,
            Trie(_) => ErrorKind::Internal,
        };
        RpcError::new(kind, err.to_string())
    }
}

impl From<nhb_state_processor::ProcessorError> for RpcError {
    fn from(err: nhb_state_processor::ProcessorError) -> Self {
        use nhb_state_processor::ProcessorError::*;
        let kind = match &err {
            ChainMismatch | BadSignature(_) | MalformedPayload(_) => ErrorKind::InvalidInput,
            NonceMismatch { .. } => ErrorKind::Conflict,
            InsufficientFundsForGas | InsufficientBalance => ErrorKind::PreconditionFailed,
            SponsorshipRejected(_) => ErrorKind::PreconditionFailed,
            QuotaExceeded { .. } => ErrorKind::ResourceExhausted,
            MissingRecipient => ErrorKind::InvalidInput,
            UnknownValidator | NothingStaked | NoRewards => ErrorKind::PreconditionFailed,
            EmissionCapExceeded { .. } => ErrorKind::ResourceExhausted,
            MerchantPaused | DeviceRevoked | DeviceMerchantMismatch { .. } => ErrorKind::PreconditionFailed,
            InvalidEpochConfig(_) => ErrorKind::InvalidInput,
            State(_) | Trie(_) => ErrorKind::Internal,
        };
        RpcError::new(kind, err.to_string())
    }
}

impl From<nhb_mempool::MempoolError> for RpcError {
    fn from(err: nhb_mempool::MempoolError) -> Self {
        use nhb_mempool::MempoolError::*;
        let kind = match &err {
            Full { .. } => ErrorKind::ResourceExhausted,
            Duplicate { .. } => ErrorKind::Conflict,
            NotFound(_) => ErrorKind::NotFound,
            SimulationRejected(_) => ErrorKind::InvalidInput,
            ProposalInFlight | NoProposalInFlight => ErrorKind::PreconditionFailed,
        };
        RpcError::new(kind, err.to_string())
    }
}

impl From<nhb_block_production::BlockProductionError> for RpcError {
    fn from(err: nhb_block_production::BlockProductionError) -> Self {
        use nhb_block_production::BlockProductionError::*;
        let kind = match &err {
            HeightMismatch { .. } | ParentMismatch | TxRootMismatch { .. } | StateRootMismatch { .. } => {
                ErrorKind::Conflict
            }
            UnknownProposer => ErrorKind::Unauthorized,
            Processor(_) | State(_) | Trie(_) | Mempool(_) => ErrorKind::Internal,
        };
        RpcError::new(kind, err.to_string())
    }
}

impl From<nhb_p2p::P2pError> for RpcError {
    fn from(err: nhb_p2p::P2pError) -> Self {
        use nhb_p2p::P2pError::*;
        let kind = match &err {
            ChainMismatch { .. } | GenesisMismatch | BadSignature(_) | NodeIdMismatch => ErrorKind::InvalidInput,
            TimestampSkew { .. } | ReplayedNonce => ErrorKind::InvalidInput,
            OversizedHandshake { .. } | OversizedMessage { .. } => ErrorKind::InvalidInput,
            RateLimited => ErrorKind::ResourceExhausted,
            Banned(_) => ErrorKind::Unauthorized,
            ExpectedHandshake => ErrorKind::InvalidInput,
            Serde(_) | Io(_) => ErrorKind::Unavailable,
            IllegalTransition(_) => ErrorKind::Internal,
        };
        RpcError::new(kind, err.to_string())
    }
}
