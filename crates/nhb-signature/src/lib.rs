//! # NHB Signature
//!
//! Sender and paymaster co-signature recovery, sitting at the exact
//! boundary `nhb-state-processor::ApplyTransaction` calls into before any
//! state mutation. The cryptography itself lives in `shared-crypto`; this
//! crate only adapts it to the processor's `(sender, paymaster)` shape and
//! adds parallel batch recovery for pre-verifying a candidate block.

pub mod errors;
pub mod recover;

pub use errors::{Result, SignatureError};
pub use recover::{batch_recover_senders, recover_paymaster, recover_sender};
