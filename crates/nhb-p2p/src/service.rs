//! The P2P server: accepts inbound connections, dials outbound ones, runs the
//! handshake and message loop over each, and periodically exchanges PEX
//! descriptors (§4.9).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::io::split;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;
use tracing::{info, warn};

use shared_crypto::Secp256k1KeyPair;

use crate::config::P2pConfig;
use crate::connection::ConnectionState;
use crate::errors::{P2pError, Result};
use crate::framing::{read_frame, write_frame, TokenBucket};
use crate::handshake::{HandshakePacket, HandshakePayload, NodeId, ReplayCache};
use crate::message::Message;
use crate::peerstore::PeerStore;
use crate::score::{Misbehavior, ScoreBook};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn random_nonce() -> [u8; 16] {
    let mut nonce = [0u8; 16];
    rand::Rng::fill(&mut rand::thread_rng(), &mut nonce);
    nonce
}

struct ConnectedPeer {
    addr: String,
    state: ConnectionState,
}

/// Shared server state, cloned into every connection task as an `Arc`.
pub struct P2pServer {
    config: P2pConfig,
    identity: Secp256k1KeyPair,
    peerstore: Mutex<PeerStore>,
    scorebook: Mutex<ScoreBook>,
    replay_cache: Mutex<ReplayCache>,
    connected: Mutex<HashMap<NodeId, ConnectedPeer>>,
    shutdown: Notify,
}

impl P2pServer {
    pub fn new(config: P2pConfig, identity: Secp256k1KeyPair) -> Arc<Self> {
        let peerstore_config = config.peerstore_config();
        let score_config = config.score_config();
        let mut peerstore = PeerStore::new(peerstore_config);
        peerstore.merge_known(config.known_addrs());
        Arc::new(Self {
            peerstore: Mutex::new(peerstore),
            scorebook: Mutex::new(ScoreBook::new(score_config)),
            replay_cache: Mutex::new(ReplayCache::new(4096)),
            connected: Mutex::new(HashMap::new()),
            shutdown: Notify::new(),
            identity,
            config,
        })
    }

    pub async fn connected_peer_count(&self) -> usize {
        self.connected.lock().await.len()
    }

    /// Signals the accept/dial/PEX loops to stop at their next wait point.
    /// `run` returns once all three have unwound; existing connections are
    /// left to their own read/write timeouts rather than force-closed.
    pub fn request_shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    /// Run the accept loop, the dial loop and the PEX loop concurrently.
    /// Returns once the listener fails to bind, or once `request_shutdown`
    /// is called and all three loops have unwound.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        info!("p2p server listening on {}", self.config.listen_addr);

        let accept_task = {
            let server = self.clone();
            tokio::spawn(async move { server.accept_loop(listener).await })
        };
        let dial_task = {
            let server = self.clone();
            tokio::spawn(async move { server.dial_loop().await })
        };
        let pex_task = {
            let server = self.clone();
            tokio::spawn(async move { server.pex_loop().await })
        };

        let _ = tokio::join!(accept_task, dial_task, pex_task);
        info!("p2p server stopped");
        Ok(())
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => return,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        let server = self.clone();
                        let addr = peer_addr.to_string();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, addr.clone(), false).await {
                                warn!("inbound connection from {addr} failed: {e}");
                            }
                        });
                    }
                    Err(e) => warn!("accept failed: {e}"),
                },
            }
        }
    }

    async fn dial_loop(self: Arc<Self>) {
        loop {
            let budget = {
                let connected = self.connected.lock().await.len();
                self.config.max_outbound.saturating_sub(connected)
            };
            if budget > 0 {
                let candidates = {
                    let store = self.peerstore.lock().await;
                    store.dial_candidates(now_secs(), budget)
                };
                for candidate in candidates {
                    let server = self.clone();
                    tokio::spawn(async move {
                        let addr = candidate.addr.clone();
                        match TcpStream::connect(&addr).await {
                            Ok(stream) => {
                                if let Err(e) = server.handle_connection(stream, addr.clone(), true).await {
                                    warn!("outbound connection to {addr} failed: {e}");
                                    server.peerstore.lock().await.record_dial_failure(&addr, now_secs());
                                }
                            }
                            Err(e) => {
                                warn!("dial to {addr} failed: {e}");
                                server.peerstore.lock().await.record_dial_failure(&addr, now_secs());
                            }
                        }
                    });
                }
            }
            tokio::select! {
                _ = self.shutdown.notified() => return,
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            }
        }
    }

    async fn pex_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => return,
                _ = tokio::time::sleep(Duration::from_secs(self.config.pex_interval_secs)) => {}
            }
            let below_min = self.connected.lock().await.len() < self.config.min_peers;
            if below_min {
                info!("peer count below min_peers, PEX results will be eligible for dialing");
            }
        }
    }

    async fn handle_connection(self: Arc<Self>, stream: TcpStream, addr: String, outbound: bool) -> Result<()> {
        let mut state = if outbound {
            ConnectionState::Dialing.transition(ConnectionState::Handshaking)?
        } else {
            ConnectionState::Handshaking
        };

        let (mut reader, mut writer) = split(stream);
        let node_id = self.perform_handshake(&mut reader, &mut writer).await?;

        if self.scorebook.lock().await.is_banned(&node_id, now_secs()) {
            state.transition(ConnectionState::Banned).ok();
            return Err(P2pError::Banned(node_id));
        }
        state = state.transition(ConnectionState::Connected)?;

        if outbound {
            self.peerstore.lock().await.record_dial_success(&addr);
        }
        self.connected.lock().await.insert(node_id, ConnectedPeer { addr: addr.clone(), state });
        info!("peer {} connected ({addr}, outbound={outbound})", hex::encode(node_id));

        let result = self.message_loop(node_id, &mut reader, &mut writer).await;
        self.connected.lock().await.remove(&node_id);
        result
    }

    async fn perform_handshake<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<NodeId>
    where
        R: tokio::io::AsyncRead + Unpin,
        W: tokio::io::AsyncWrite + Unpin,
    {
        let payload = HandshakePayload {
            chain_id: self.config.chain_id,
            genesis_hash: self.config.genesis_hash,
            client_version: self.config.client_version.clone(),
            node_id: self.identity.node_id(),
            listen_addr: self.config.listen_addr.clone(),
            timestamp: now_secs(),
            nonce: random_nonce(),
        };
        let own_packet = HandshakePacket::sign(payload, &self.identity)?;
        let own_message = Message::Handshake(own_packet);
        write_frame(writer, &own_message.encode()?, self.config.max_message_bytes).await?;

        let frame = read_frame(reader, self.config.max_message_bytes).await?;
        let peer_message = Message::decode(&frame)?;
        let Message::Handshake(peer_packet) = peer_message else {
            return Err(P2pError::ExpectedHandshake);
        };

        let mut replay_cache = self.replay_cache.lock().await;
        crate::handshake::verify_handshake(&peer_packet, &self.config.handshake_config(), &mut replay_cache, now_secs())
    }

    async fn message_loop<R, W>(&self, node_id: NodeId, reader: &mut R, writer: &mut W) -> Result<()>
    where
        R: tokio::io::AsyncRead + Unpin,
        W: tokio::io::AsyncWrite + Unpin,
    {
        let mut bucket = TokenBucket::new(self.config.rate_msgs_per_sec, self.config.burst);
        let ping_interval = Duration::from_secs(self.config.ping_interval_secs);
        let ping_timeout = Duration::from_secs(self.config.ping_timeout_secs);

        loop {
            match timeout(ping_interval, read_frame(reader, self.config.max_message_bytes)).await {
                Ok(Ok(frame)) => {
                    if !bucket.try_consume(now_secs() as f64) {
                        self.scorebook.lock().await.record(node_id, Misbehavior::RateLimitViolation, now_secs());
                        return Err(P2pError::RateLimited);
                    }
                    self.dispatch(node_id, &frame, writer).await?;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    // Inactivity: ping, then give the peer ping_timeout to reply.
                    write_frame(writer, &Message::Ping.encode()?, self.config.max_message_bytes).await?;
                    match timeout(ping_timeout, read_frame(reader, self.config.max_message_bytes)).await {
                        Ok(Ok(frame)) => self.dispatch(node_id, &frame, writer).await?,
                        _ => return Ok(()),
                    }
                }
            }
        }
    }

    async fn dispatch<W>(&self, node_id: NodeId, frame: &[u8], writer: &mut W) -> Result<()>
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        let message = match Message::decode(frame) {
            Ok(m) => m,
            Err(_) => {
                self.scorebook.lock().await.record(node_id, Misbehavior::InvalidPayload, now_secs());
                return Ok(());
            }
        };
        match message {
            Message::Ping => write_frame(writer, &Message::Pong.encode()?, self.config.max_message_bytes).await,
            Message::Pong => Ok(()),
            Message::PexRequest => {
                let sample = self.peerstore.lock().await.pex_sample(self.config.pex_sample_size, now_secs());
                write_frame(writer, &Message::PexResponse(sample).encode()?, self.config.max_message_bytes).await
            }
            Message::PexResponse(descriptors) => {
                self.peerstore.lock().await.ingest_pex(descriptors);
                Ok(())
            }
            Message::Handshake(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn perform_handshake_succeeds_between_two_servers_over_a_duplex() {
        let (client_io, server_io) = tokio::io::duplex(8192);
        let (mut client_reader, mut client_writer) = split(client_io);
        let (mut server_reader, mut server_writer) = split(server_io);

        let config = P2pConfig {
            chain_id: 7,
            genesis_hash: [3u8; 32],
            ..P2pConfig::default()
        };
        let client = P2pServer::new(config.clone(), Secp256k1KeyPair::from_bytes([0x01; 32]).unwrap());
        let server = P2pServer::new(config, Secp256k1KeyPair::from_bytes([0x02; 32]).unwrap());
        let expected_client_id = client.identity.node_id();
        let expected_server_id = server.identity.node_id();

        let client_task = tokio::spawn(async move { client.perform_handshake(&mut client_reader, &mut client_writer).await });
        let server_task = tokio::spawn(async move { server.perform_handshake(&mut server_reader, &mut server_writer).await });

        let client_saw = client_task.await.unwrap().unwrap();
        let server_saw = server_task.await.unwrap().unwrap();

        assert_eq!(client_saw, expected_server_id);
        assert_eq!(server_saw, expected_client_id);
    }

    #[tokio::test]
    async fn chain_mismatch_fails_the_handshake() {
        let (client_io, server_io) = tokio::io::duplex(8192);
        let (mut client_reader, mut client_writer) = split(client_io);
        let (mut server_reader, mut server_writer) = split(server_io);

        let client_config = P2pConfig {
            chain_id: 7,
            genesis_hash: [3u8; 32],
            ..P2pConfig::default()
        };
        let server_config = P2pConfig {
            chain_id: 8,
            genesis_hash: [3u8; 32],
            ..P2pConfig::default()
        };
        let client = P2pServer::new(client_config, Secp256k1KeyPair::from_bytes([0x01; 32]).unwrap());
        let server = P2pServer::new(server_config, Secp256k1KeyPair::from_bytes([0x02; 32]).unwrap());

        let client_task = tokio::spawn(async move { client.perform_handshake(&mut client_reader, &mut client_writer).await });
        let server_task = tokio::spawn(async move { server.perform_handshake(&mut server_reader, &mut server_writer).await });

        let client_result = client_task.await.unwrap();
        let server_result = server_task.await.unwrap();
        assert!(client_result.is_err() || server_result.is_err());
    }
}
