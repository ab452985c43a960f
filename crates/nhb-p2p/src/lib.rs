//! # NHB P2P
//!
//! The peer-to-peer server (§4.9): signed handshakes, length-prefixed wire
//! framing with per-peer rate limiting, misbehavior scoring and bans, dial
//! budget with exponential backoff, peer exchange, and heartbeats.

pub mod config;
pub mod connection;
pub mod errors;
pub mod framing;
pub mod handshake;
pub mod message;
pub mod peerstore;
pub mod score;
pub mod service;

pub use config::P2pConfig;
pub use connection::ConnectionState;
pub use errors::{P2pError, Result};
pub use handshake::{HandshakeConfig, HandshakePacket, HandshakePayload, NodeId, ReplayCache};
pub use message::Message;
pub use peerstore::{PeerDescriptor, PeerStore, PeerStoreConfig};
pub use score::{Misbehavior, ScoreBook, ScoreConfig};
pub use service::P2pServer;
