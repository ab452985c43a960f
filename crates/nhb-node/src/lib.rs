//! # NHB Node
//!
//! Ties `nhb-trie`, `nhb-state`, `nhb-mempool`, `nhb-state-processor`,
//! `nhb-block-production` and `nhb-p2p` into a running process: genesis
//! construction (§6), unified configuration (§9), RPC error mapping (§7)
//! and the subsystem wiring the binary in `main.rs` starts.

pub mod config;
pub mod genesis;
pub mod rpc_errors;
pub mod wiring;

pub use config::NodeConfig;
pub use genesis::{build_genesis, GenesisError, GenesisOutput, GenesisSpec};
pub use rpc_errors::{ErrorKind, RpcError};
pub use wiring::Node;
