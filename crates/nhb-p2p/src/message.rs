//! Messages exchanged after a connection has handshaken (§4.9: PEX,
//! heartbeats). Block/transaction gossip rides the same framing but is
//! dispatched by the node layer, not here.

use serde::{Deserialize, Serialize};

use crate::handshake::HandshakePacket;
use crate::peerstore::PeerDescriptor;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Message {
    Handshake(HandshakePacket),
    Ping,
    Pong,
    #[serde(rename = "pex.request")]
    PexRequest,
    #[serde(rename = "pex.response")]
    PexResponse(Vec<PeerDescriptor>),
}

impl Message {
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
