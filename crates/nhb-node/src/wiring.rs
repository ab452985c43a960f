//! Subsystem wiring. Mirrors the teacher's phased `SubsystemContainer::new`:
//! shared infrastructure first, then each subsystem in dependency order,
//! logging a line per phase so a cold start is legible from the console.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use shared_bus::InMemoryEventBus;
use shared_crypto::Secp256k1KeyPair;
use shared_types::{Address, ChainId};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use nhb_block_production::BlockProducer;
use nhb_mempool::Mempool;
use nhb_p2p::P2pServer;
use nhb_state_processor::StateProcessor;
use nhb_trie::MemoryTrieDb;

use crate::config::NodeConfig;
use crate::genesis::{build_genesis, GenesisSpec};

/// Everything the running node owns, wired together and ready to serve.
pub struct Node {
    config: NodeConfig,
    chain_id: ChainId,
    genesis_hash: shared_types::Hash,
    identity: Secp256k1KeyPair,
    producer: Mutex<BlockProducer<MemoryTrieDb>>,
    mempool: Arc<Mempool>,
    p2p: Arc<P2pServer>,
    events: Arc<InMemoryEventBus>,
    shutdown: Notify,
}

impl Node {
    /// Reads the genesis file named by `config.chain.genesis_path`, builds
    /// state from it, and wires every subsystem on top.
    #[instrument(name = "node_init", skip(config))]
    pub fn new(config: NodeConfig) -> Result<Arc<Self>> {
        info!("Phase 1: loading genesis from {:?}", config.chain.genesis_path);
        let raw = std::fs::read(&config.chain.genesis_path)
            .with_context(|| format!("reading genesis file {:?}", config.chain.genesis_path))?;
        let spec = GenesisSpec::from_json(&raw).context("parsing genesis file")?;
        let genesis = build_genesis(&spec, config.chain.chain_id).context("building genesis state")?;
        info!(
            chain_id = genesis.chain_id.0,
            genesis_hash = %hex::encode(genesis.genesis_hash),
            "genesis constructed"
        );

        info!("Phase 2: loading validator identity");
        let identity = load_identity(config.chain.identity_key_path.as_deref())?;
        info!(node_id = %hex::encode(identity.node_id()), address = %Address(identity.address()), "identity loaded");

        info!("Phase 3: initializing mempool");
        let mempool = Arc::new(Mempool::new(config.mempool_config()));

        info!("Phase 4: initializing state processor");
        let processor_config = config.processor_config(genesis.chain_id);
        let processor = StateProcessor::new(genesis.state, processor_config).context("constructing state processor")?;

        info!("Phase 5: initializing block producer");
        let producer = BlockProducer::new(processor, mempool.clone(), genesis.genesis_hash);

        info!("Phase 6: initializing event bus");
        let events = Arc::new(InMemoryEventBus::new());

        info!("Phase 7: initializing p2p server");
        let p2p_config = config.p2p_config(genesis.genesis_hash);
        // `Secp256k1KeyPair` isn't `Clone` (its secret zeroizes on drop), so
        // the P2P server gets its own instance restored from the same bytes.
        let p2p_identity = Secp256k1KeyPair::from_bytes(identity.to_bytes())
            .map_err(|e| anyhow::anyhow!("re-deriving p2p identity: {e}"))?;
        let p2p = P2pServer::new(p2p_config, p2p_identity);

        Ok(Arc::new(Self {
            config,
            chain_id: genesis.chain_id,
            genesis_hash: genesis.genesis_hash,
            identity,
            producer: Mutex::new(producer),
            mempool,
            p2p,
            events,
            shutdown: Notify::new(),
        }))
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn genesis_hash(&self) -> shared_types::Hash {
        self.genesis_hash
    }

    pub fn mempool(&self) -> &Arc<Mempool> {
        &self.mempool
    }

    pub fn events(&self) -> &Arc<InMemoryEventBus> {
        &self.events
    }

    /// Spawns the P2P server and the fixed-interval proposer loop, then
    /// waits for both to unwind. Call [`Node::request_shutdown`] from
    /// another task (or a signal handler) to stop it.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let p2p_task: JoinHandle<()> = {
            let p2p = self.p2p.clone();
            tokio::spawn(async move {
                if let Err(e) = p2p.run().await {
                    warn!("p2p server exited: {e}");
                }
            })
        };

        let production_task: JoinHandle<()> = {
            let node = self.clone();
            tokio::spawn(async move { node.production_loop().await })
        };

        let _ = tokio::join!(p2p_task, production_task);
        Ok(())
    }

    /// Signals the P2P server and the proposer loop to stop. The caller is
    /// expected to await `run`'s return afterward; this only requests it.
    pub fn request_shutdown(&self) {
        self.p2p.request_shutdown();
        self.shutdown.notify_waiters();
    }

    async fn production_loop(self: Arc<Self>) {
        let interval = std::time::Duration::from_secs(self.config.chain.block_time_secs.max(1));
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("proposer loop stopping");
                    return;
                }
                _ = tokio::time::sleep(interval) => {}
            }
            if let Err(e) = self.produce_one_block().await {
                warn!("block production failed: {e}");
            }
        }
    }

    async fn produce_one_block(&self) -> Result<()> {
        let validator = Address(self.identity.address());
        let now = now_secs();
        let day = day_string(now);

        let block = {
            let producer = self.producer.lock();
            producer.propose_block(validator, now, &day)?
        };
        if block.transactions.is_empty() {
            return Ok(());
        }

        let events = {
            let mut producer = self.producer.lock();
            producer.commit_block(&block)?
        };

        let mut buffer = shared_bus::EventBuffer::new();
        for event in events {
            buffer.push(event);
        }
        let delivered = self.events.flush(buffer);
        info!(
            height = block.header.height,
            txs = block.transactions.len(),
            events_delivered = delivered,
            "block committed"
        );
        Ok(())
    }
}

fn load_identity(path: Option<&Path>) -> Result<Secp256k1KeyPair> {
    match path {
        Some(path) => {
            let bytes = std::fs::read(path).with_context(|| format!("reading identity key {path:?}"))?;
            let arr: [u8; 32] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| anyhow::anyhow!("identity key {path:?} must be exactly 32 bytes"))?;
            Secp256k1KeyPair::from_bytes(arr).map_err(|e| anyhow::anyhow!("invalid identity key: {e}"))
        }
        None => {
            warn!("no identity_key_path configured, generating an ephemeral validator key");
            Ok(Secp256k1KeyPair::generate())
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn day_string(timestamp: u64) -> String {
    const SECS_PER_DAY: u64 = 86_400;
    let days_since_epoch = timestamp / SECS_PER_DAY;
    let z = days_since_epoch as i64 + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    format!("{y:04}-{m:02}-{d:02}")
}
