//! # NHB State Processor
//!
//! The block lifecycle sitting between the mempool and the trie: reward
//! accrual (§4.4), epoch rotation (§4.5), the state transition for each
//! transaction kind (§4.6), paymaster sponsorship evaluation (§4.7), and the
//! per-module quota model (§4.6). Every other crate in the node treats
//! [`processor::StateProcessor`] as the single entry point for turning a
//! transaction into state changes.

pub mod epoch;
pub mod errors;
pub mod payload;
pub mod processor;
pub mod reward;
pub mod sponsorship;

pub use errors::{ProcessorError, Result};
pub use processor::{ProcessorConfig, QuotaConfig, StateProcessor};
