//! Mempool-driven proposer and `CommitBlock` lifecycle (§4.8).
//!
//! Both [`BlockProducer::propose_block`] and [`BlockProducer::commit_block`]
//! reapply their candidate's transactions from scratch against a fresh
//! `State::copy()` of the chain's live state — propose so the header it
//! hands back already carries the roots a later commit will recompute,
//! commit so a block is never trusted on a remote proposer's say-so. A
//! commit that disagrees with its own header resets the trie to the
//! pre-block root and restores the in-flight mempool batch verbatim, so the
//! caller can retry against the exact same entries (pointer identity and
//! all).

use std::sync::Arc;

use nhb_mempool::Mempool;
use nhb_state_processor::StateProcessor;
use nhb_trie::TrieDb;
use shared_types::{Address, Block, BlockHeader, Event, Hash, Transaction};
use tracing::{info, warn};

use crate::errors::{BlockProductionError, Result};

/// Drives one chain's block lifecycle over one [`StateProcessor`]. Not
/// `Sync` by itself — callers that need concurrent access wrap it the way
/// `nhb-mempool` wraps its pool, behind a mutex.
pub struct BlockProducer<D: TrieDb + Clone> {
    processor: StateProcessor<D>,
    mempool: Arc<Mempool>,
    chain_tip: Hash,
    height: u64,
}

impl<D: TrieDb + Clone> BlockProducer<D> {
    pub fn new(processor: StateProcessor<D>, mempool: Arc<Mempool>, genesis_hash: Hash) -> Self {
        Self {
            processor,
            mempool,
            chain_tip: genesis_hash,
            height: 0,
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn chain_tip(&self) -> Hash {
        self.chain_tip
    }

    pub fn processor(&self) -> &StateProcessor<D> {
        &self.processor
    }

    /// Drains the mempool and assembles a candidate block. The header's
    /// `state_root`/`tx_root` come from deterministically reapplying every
    /// drained transaction against a scratch copy of the live state — the
    /// proposer never mutates its own chain state here.
    pub fn propose_block(&self, validator: Address, timestamp: u64, day: &str) -> Result<Block> {
        let entries = self.mempool.propose();
        let transactions: Vec<Transaction> = entries.iter().map(|e| (*e.tx).clone()).collect();

        let height = self.height + 1;
        let outcome = self.reapply(&self.processor.state, &transactions, height, timestamp, day);
        let (tx_root, state_root) = match outcome {
            Ok((tx_root, state_root, _, _)) => (tx_root, state_root),
            Err(e) => {
                self.mempool.rollback()?;
                return Err(e);
            }
        };

        Ok(Block {
            header: BlockHeader {
                height,
                timestamp,
                prev_hash: self.chain_tip,
                state_root,
                tx_root,
                validator,
            },
            transactions,
        })
    }

    /// Validates `block`'s header against the chain's working state,
    /// reapplies its transactions deterministically, and commits only if
    /// the recomputed roots match the header exactly. Returns the block's
    /// events in application order, for the caller to publish.
    pub fn commit_block(&mut self, block: &Block) -> Result<Vec<Event>> {
        let expected_height = self.height + 1;
        if block.header.height != expected_height {
            return Err(BlockProductionError::HeightMismatch {
                expected: expected_height,
                got: block.header.height,
            });
        }
        if block.header.prev_hash != self.chain_tip {
            return Err(BlockProductionError::ParentMismatch);
        }
        if !self
            .processor
            .state
            .load_validator_set()
            .iter()
            .any(|v| v.address == block.header.validator)
        {
            return Err(BlockProductionError::UnknownProposer);
        }

        let day = day_string(block.header.timestamp);
        let pre_root = self.processor.state.root_hash()?;
        let outcome = self.reapply(&self.processor.state, &block.transactions, block.header.height, block.header.timestamp, &day);

        let (tx_root, state_root, applied_state, events) = match outcome {
            Ok(r) => r,
            Err(e) => {
                warn!("commit_block: reapplication failed at height {}: {e}", block.header.height);
                self.processor.state.reset(pre_root)?;
                self.mempool.rollback()?;
                return Err(e);
            }
        };

        if tx_root != block.header.tx_root {
            self.processor.state.reset(pre_root)?;
            self.mempool.rollback()?;
            return Err(BlockProductionError::TxRootMismatch {
                header: hex::encode(block.header.tx_root),
                recomputed: hex::encode(tx_root),
            });
        }
        if state_root != block.header.state_root {
            self.processor.state.reset(pre_root)?;
            self.mempool.rollback()?;
            return Err(BlockProductionError::StateRootMismatch {
                header: hex::encode(block.header.state_root),
                recomputed: hex::encode(state_root),
            });
        }

        self.processor.state = applied_state;
        self.processor.state.commit(block.header.prev_hash, block.header.height)?;

        let included: Vec<Hash> = block.transactions.iter().map(|t| t.hash()).collect();
        self.mempool.commit(&included)?;

        self.chain_tip = block.hash();
        self.height = block.header.height;
        info!("committed block {} ({} txs)", self.height, block.transactions.len());
        Ok(events)
    }

    /// Reapplies `transactions` in order against a scratch copy of `base`,
    /// returning the transaction root, post-application state root, the
    /// scratch state itself (so a successful commit can adopt it directly
    /// instead of reapplying a third time), and the events each transaction
    /// raised. Epoch-boundary lifecycle processing (rotation, pool
    /// computation, reward settlement) runs here too, after `end_block`,
    /// so `propose_block` and `commit_block` compute identical roots for
    /// it — it cannot be deferred to `commit_block` alone without the
    /// proposer's header roots drifting from what commit recomputes.
    fn reapply(
        &self,
        base: &nhb_state::State<D>,
        transactions: &[Transaction],
        height: u64,
        timestamp: u64,
        day: &str,
    ) -> Result<(Hash, Hash, nhb_state::State<D>, Vec<Event>)> {
        let mut scratch = StateProcessor::new(base.copy(), self.processor.config().clone())?;
        scratch.begin_block(height, timestamp);
        for (index, tx) in transactions.iter().enumerate() {
            scratch
                .apply_transaction(tx, height, timestamp, day)
                .map_err(|e| {
                    warn!("reapply: transaction {index} rejected at height {height}: {e}");
                    e
                })?;
        }
        let mut events = scratch.end_block(height, timestamp);

        let candidates = live_candidates(&scratch.state);
        events.extend(scratch.process_block_lifecycle(height, &candidates));

        let tx_hashes: Vec<Hash> = transactions.iter().map(|t| t.hash()).collect();
        let tx_root = shared_crypto::keccak256_many(&tx_hashes.iter().map(|h| h.as_slice()).collect::<Vec<_>>());
        let mut state = scratch.state;
        let state_root = state.root_hash()?;
        Ok((tx_root, state_root, state, events))
    }
}

/// Builds this block's `Candidate` list from the currently registered
/// validator set, reading each validator's live stake/engagement off its
/// account rather than the set's own (registration-time) `power` snapshot.
fn live_candidates<D: TrieDb + Clone>(state: &nhb_state::State<D>) -> Vec<nhb_state_processor::epoch::Candidate> {
    state
        .load_validator_set()
        .iter()
        .map(|entry| {
            let account = state.get_account(&entry.address);
            nhb_state_processor::epoch::Candidate {
                address: entry.address,
                stake: account.stake,
                engagement: account.engagement_score,
            }
        })
        .collect()
}

fn day_string(timestamp: u64) -> String {
    const SECS_PER_DAY: u64 = 86_400;
    let days_since_epoch = timestamp / SECS_PER_DAY;
    // Civil-from-days (Howard Hinnant's algorithm), proleptic Gregorian.
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

#[cfg(test)]
mod tests {
    use super::*;
    use nhb_mempool::MempoolConfig;
    use nhb_state_processor::ProcessorConfig;
    use nhb_state_processor::epoch::EpochConfig;
    use nhb_state_processor::sponsorship::ThrottleLimits;
    use nhb_trie::MemoryTrieDb;
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::{Amount, ChainId, TxType};

    fn config() -> ProcessorConfig {
        ProcessorConfig {
            chain_id: ChainId(7),
            apr_bps: 500,
            validators_bps: 5_000,
            stakers_bps: 4_000,
            epoch: EpochConfig {
                length: 1_000,
                stake_weight: 1,
                engagement_weight: 1,
                max_validators: 4,
                rotation_enabled: false,
            },
            emission_steps: vec![],
            epoch_cap: None,
            global_cap: None,
            throttles: ThrottleLimits {
                per_paymaster_daily: Amount::from(1_000_000u64),
                per_merchant_daily: Amount::from(1_000_000u64),
                per_device_daily: Amount::from(1_000_000u64),
                per_device_daily_tx_count: 1_000,
                global_daily: Amount::from(10_000_000u64),
            },
            auto_topup: None,
            unbond_delay_blocks: 10,
            quota: nhb_state_processor::QuotaConfig { max_requests_per_min: 60, epoch_seconds: 60 },
        }
    }

    fn signed_transfer(key: &Secp256k1KeyPair, nonce: u64, to: Address, value: Amount) -> Transaction {
        let mut tx = Transaction {
            chain_id: ChainId(7),
            tx_type: TxType::Transfer,
            nonce,
            to: Some(to),
            value,
            gas_limit: 21_000,
            gas_price: Amount::from(1u64),
            data: vec![],
            paymaster: None,
            paymaster_signature: None,
            signature: shared_crypto::Secp256k1Signature::from_parts([0; 32], [0; 32], 27),
            merchant_address: None,
        };
        tx.signature = key.sign(&tx.signing_digest());
        tx
    }

    fn producer_with_validator(validator: Address, balance_holder: Address) -> BlockProducer<MemoryTrieDb> {
        let mut state = nhb_state::State::<MemoryTrieDb>::new();
        state.set_balance(&balance_holder, "NHB", Amount::from(1_000_000u64));
        state.write_validator_set(vec![nhb_state::validator_set::ValidatorEntry {
            address: validator,
            power: 100,
            moniker: "v0".to_string(),
            pubkey: vec![],
        }]);
        let processor = StateProcessor::new(state, config()).unwrap();
        let mempool = Arc::new(Mempool::new(MempoolConfig { limit: 100, unlimited_opt_in: false }));
        BlockProducer::new(processor, mempool, Hash::default())
    }

    #[test]
    fn propose_then_commit_advances_height_and_tip() {
        let key = Secp256k1KeyPair::generate();
        let sender = Address(key.address());
        let validator = Address([0x99; 20]);
        let mut producer = producer_with_validator(validator, sender);

        let tx = signed_transfer(&key, 0, Address([0xAA; 20]), Amount::from(100u64));
        producer.mempool.add(tx, sender, 1_000, None).unwrap();

        let block = producer.propose_block(validator, 1_000, "2026-07-26").unwrap();
        assert_eq!(block.header.height, 1);
        assert_eq!(block.transactions.len(), 1);

        let events = producer.commit_block(&block).unwrap();
        assert!(events.iter().any(|e| e.event_type == "transfer.native"));
        assert_eq!(producer.height(), 1);
        assert_eq!(producer.chain_tip(), block.hash());
        assert_eq!(producer.processor().state.get_balance(&Address([0xAA; 20]), "NHB"), Amount::from(100u64));
    }

    #[test]
    fn commit_with_wrong_state_root_rolls_back_and_restores_mempool() {
        let key = Secp256k1KeyPair::generate();
        let sender = Address(key.address());
        let validator = Address([0x99; 20]);
        let mut producer = producer_with_validator(validator, sender);

        let tx = signed_transfer(&key, 0, Address([0xAA; 20]), Amount::from(100u64));
        producer.mempool.add(tx, sender, 1_000, None).unwrap();

        let mut block = producer.propose_block(validator, 1_000, "2026-07-26").unwrap();
        block.header.state_root = Hash::default();

        let err = producer.commit_block(&block).unwrap_err();
        assert!(matches!(err, BlockProductionError::StateRootMismatch { .. }));
        assert_eq!(producer.height(), 0);

        // The transaction is back in the pool, available for reproposal.
        assert_eq!(producer.mempool.len(), 1);
    }

    #[test]
    fn commit_rejects_unregistered_validator() {
        let key = Secp256k1KeyPair::generate();
        let sender = Address(key.address());
        let validator = Address([0x99; 20]);
        let mut producer = producer_with_validator(validator, sender);

        let mut block = producer.propose_block(validator, 1_000, "2026-07-26").unwrap();
        block.header.validator = Address([0x77; 20]);

        let err = producer.commit_block(&block).unwrap_err();
        assert!(matches!(err, BlockProductionError::UnknownProposer));
    }

    #[test]
    fn day_string_formats_a_known_epoch_second() {
        assert_eq!(day_string(1_753_488_000), "2025-07-26");
    }
}
