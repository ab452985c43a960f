//! Unified node configuration (§9's design note: one explicit `NodeConfig`
//! built once at startup and passed down, never a global/static).

use std::path::PathBuf;

use primitive_types::U256;
use shared_types::ChainId;

use nhb_mempool::MempoolConfig;
use nhb_p2p::P2pConfig;
use nhb_state_processor::epoch::EpochConfig;
use nhb_state_processor::reward::EmissionStep;
use nhb_state_processor::sponsorship::{AutoTopupPolicy, ThrottleLimits};
use nhb_state_processor::{ProcessorConfig, QuotaConfig};

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub chain: ChainConfig,
    pub storage: StorageConfig,
    pub network: NetworkConfig,
    pub mempool: MempoolKnobs,
    pub rewards: RewardConfig,
    pub sponsorship: SponsorshipConfig,
    pub quota: QuotaKnobs,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            storage: StorageConfig::default(),
            network: NetworkConfig::default(),
            mempool: MempoolKnobs::default(),
            rewards: RewardConfig::default(),
            sponsorship: SponsorshipConfig::default(),
            quota: QuotaKnobs::default(),
        }
    }
}

impl NodeConfig {
    /// Builds the [`ProcessorConfig`] the state processor runs with, binding
    /// in the chain id resolved from genesis.
    pub fn processor_config(&self, chain_id: ChainId) -> ProcessorConfig {
        ProcessorConfig {
            chain_id,
            apr_bps: self.rewards.apr_bps,
            validators_bps: self.rewards.validators_bps,
            stakers_bps: self.rewards.stakers_bps,
            epoch: self.rewards.epoch,
            emission_steps: self.rewards.emission_steps.clone(),
            epoch_cap: self.rewards.epoch_cap,
            global_cap: self.rewards.global_cap,
            throttles: self.sponsorship.throttles.clone(),
            auto_topup: self.sponsorship.auto_topup.clone(),
            unbond_delay_blocks: self.rewards.unbond_delay_blocks,
            quota: QuotaConfig {
                max_requests_per_min: self.quota.max_requests_per_min,
                epoch_seconds: self.quota.epoch_seconds,
            },
        }
    }

    pub fn mempool_config(&self) -> MempoolConfig {
        MempoolConfig {
            limit: self.mempool.limit,
            unlimited_opt_in: self.mempool.unlimited_opt_in,
        }
    }

    /// Builds the [`P2pConfig`] the server listens with, binding in the
    /// genesis hash so peers on a different chain are rejected at handshake.
    pub fn p2p_config(&self, genesis_hash: [u8; 32]) -> P2pConfig {
        P2pConfig {
            chain_id: self.chain.chain_id,
            genesis_hash,
            listen_addr: self.network.listen_addr.clone(),
            seeds: self.network.seeds.clone(),
            bootnodes: self.network.bootnodes.clone(),
            persistent_peers: self.network.persistent_peers.clone(),
            max_outbound: self.network.max_outbound,
            ..P2pConfig::default()
        }
    }
}

/// Chain identity and genesis source.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Falls back to genesis's own `chainID` field when unset there; this
    /// value wins when both are present and disagree, matching the teacher's
    /// "config overrides file" convention.
    pub chain_id: u64,
    pub genesis_path: PathBuf,
    /// Raw 32-byte secp256k1 scalar for this node's validator identity. When
    /// unset a fresh key is generated at startup (devnet convenience); a
    /// node meant to propose blocks across restarts must set this.
    pub identity_key_path: Option<PathBuf>,
    /// Fixed interval between proposal attempts.
    pub block_time_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            genesis_path: PathBuf::from("./genesis.json"),
            identity_key_path: None,
            block_time_secs: 12,
        }
    }
}

/// On-disk layout.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// P2P and RPC listen configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub listen_addr: String,
    pub rpc_addr: String,
    pub seeds: Vec<String>,
    pub bootnodes: Vec<String>,
    pub persistent_peers: Vec<String>,
    pub max_outbound: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:26656".to_string(),
            rpc_addr: "0.0.0.0:8545".to_string(),
            seeds: Vec::new(),
            bootnodes: Vec::new(),
            persistent_peers: Vec::new(),
            max_outbound: 16,
        }
    }
}

/// Mempool admission limits.
#[derive(Debug, Clone)]
pub struct MempoolKnobs {
    pub limit: usize,
    pub unlimited_opt_in: bool,
}

impl Default for MempoolKnobs {
    fn default() -> Self {
        Self {
            limit: 5000,
            unlimited_opt_in: false,
        }
    }
}

/// Reward engine and epoch rotation parameters (§4.4/§4.5). Not part of the
/// genesis file — these are node-operated policy, not chain state.
#[derive(Debug, Clone)]
pub struct RewardConfig {
    pub apr_bps: u64,
    pub validators_bps: u64,
    pub stakers_bps: u64,
    pub epoch: EpochConfig,
    pub emission_steps: Vec<EmissionStep>,
    pub epoch_cap: Option<U256>,
    pub global_cap: Option<U256>,
    pub unbond_delay_blocks: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            apr_bps: 1_000,
            validators_bps: 6_000,
            stakers_bps: 4_000,
            epoch: EpochConfig {
                length: 100,
                stake_weight: 70,
                engagement_weight: 30,
                max_validators: 100,
                rotation_enabled: true,
            },
            emission_steps: vec![EmissionStep {
                start_epoch: 0,
                amount: U256::from(1_000u64) * U256::exp10(18),
                decay: None,
            }],
            epoch_cap: None,
            global_cap: None,
            unbond_delay_blocks: 100,
        }
    }
}

/// Paymaster sponsorship policy (§4.7).
#[derive(Debug, Clone)]
pub struct SponsorshipConfig {
    pub throttles: ThrottleLimits,
    pub auto_topup: Option<AutoTopupPolicy>,
}

impl Default for SponsorshipConfig {
    fn default() -> Self {
        Self {
            throttles: ThrottleLimits {
                per_paymaster_daily: U256::from(10_000u64) * U256::exp10(18),
                per_merchant_daily: U256::from(1_000u64) * U256::exp10(18),
                per_device_daily: U256::from(100u64) * U256::exp10(18),
                per_device_daily_tx_count: 50,
                global_daily: U256::from(100_000u64) * U256::exp10(18),
            },
            auto_topup: None,
        }
    }
}

/// Per-module request quota (§4.6). Node-operated policy, like
/// [`RewardConfig`] and [`SponsorshipConfig`] — not part of the genesis file.
#[derive(Debug, Clone)]
pub struct QuotaKnobs {
    pub max_requests_per_min: u64,
    pub epoch_seconds: u64,
}

impl Default for QuotaKnobs {
    fn default() -> Self {
        Self {
            max_requests_per_min: 60,
            epoch_seconds: 60,
        }
    }
}
