//! # Shared Types
//!
//! The domain entities every other crate in the node builds on: addresses,
//! accounts, transactions, blocks and the event a block emits while applying.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
