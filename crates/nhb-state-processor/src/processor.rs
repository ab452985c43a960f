//! Block lifecycle (§4.6): `BeginBlock` runs per-block housekeeping ahead of
//! any transaction, `ApplyTransaction` is the all-or-nothing state
//! transition for one transaction, `EndBlock` flushes the block's events,
//! and `ProcessBlockLifecycle` drives epoch rotation at an epoch boundary.
//!
//! `ApplyTransaction` never leaves partial state behind: every mutation
//! happens against a scratch copy of the trie (`State::copy`, the same
//! cheap structural-sharing copy the block proposer uses for speculative
//! execution) and is only swapped in once the whole transaction succeeds.

use nhb_trie::TrieDb;
use shared_bus::EventBuffer;
use shared_types::{Address, Amount, ChainId, Event, PendingUnbond, Transaction, TxType};

use crate::epoch::EpochConfig;
use crate::errors::{ProcessorError, Result};
use crate::payload::{
    self, CancelClaimablePayload, CreateClaimablePayload, DelegatePayload, JoinLoyaltyProgramPayload,
    PosAuthorizePayload, RedeemClaimablePayload, RegisterValidatorPayload, SetAliasPayload, UndelegatePayload,
};
use crate::reward::{self, EmissionStep};
use crate::sponsorship::{self, AutoTopupContext, AutoTopupPolicy, SponsorshipAssessment, ThrottleLimits};

/// Quota model (§4.6): `{MaxRequestsPerMin, EpochSeconds}`, global per module.
/// Counters are bucketed by the rolling value `EndBlock` advances in
/// [`nhb_state::quota::QuotaEpochRecord`], not by wall-clock division, so a
/// bucket only turns over once `EpochSeconds` have actually elapsed between
/// blocks.
#[derive(Clone, Debug)]
pub struct QuotaConfig {
    pub max_requests_per_min: u64,
    pub epoch_seconds: u64,
}

#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    pub chain_id: ChainId,
    pub apr_bps: u64,
    pub validators_bps: u64,
    pub stakers_bps: u64,
    pub epoch: EpochConfig,
    pub emission_steps: Vec<EmissionStep>,
    pub epoch_cap: Option<Amount>,
    pub global_cap: Option<Amount>,
    pub throttles: ThrottleLimits,
    pub auto_topup: Option<AutoTopupPolicy>,
    pub unbond_delay_blocks: u64,
    pub quota: QuotaConfig,
}

/// Glues reward accrual, epoch rotation, sponsorship evaluation and the
/// per-`TxType` state transitions together over one [`nhb_state::State`].
pub struct StateProcessor<D: TrieDb + Clone> {
    pub state: nhb_state::State<D>,
    pub events: EventBuffer,
    config: ProcessorConfig,
}

impl<D: TrieDb + Clone> StateProcessor<D> {
    pub fn new(state: nhb_state::State<D>, config: ProcessorConfig) -> Result<Self> {
        config.epoch.validate()?;
        Ok(Self {
            state,
            events: EventBuffer::new(),
            config,
        })
    }

    /// The configuration this processor was built with — block production
    /// needs it to spin up a scratch processor over a copied trie for
    /// speculative/deterministic-reapplication block assembly.
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Per-block housekeeping that runs before any transaction is applied:
    /// claimable expiry, unbond release, and the global reward index tick.
    pub fn begin_block(&mut self, height: u64, timestamp: u64) {
        self.events = EventBuffer::new();

        for claimable in self.state.expire_sweep(timestamp) {
            let refund = self.state.get_balance(&claimable.payer, &claimable.token) + claimable.amount;
            self.state.set_balance(&claimable.payer, &claimable.token, refund);
            self.events.push(
                Event::new("claimable.expired")
                    .with("payer", claimable.payer.to_string())
                    .with("amount", claimable.amount.to_string()),
            );
        }

        for address in self.state.accounts_with_pending_unbonds() {
            let mut account = self.state.get_account(&address);
            if account.pending_unbonds.is_empty() {
                continue;
            }
            let (matured, pending): (Vec<PendingUnbond>, Vec<PendingUnbond>) = account
                .pending_unbonds
                .into_iter()
                .partition(|u| u.release_height <= height);
            account.pending_unbonds = pending;
            for unbond in matured {
                account.locked_znhb -= unbond.amount;
                account.balance_znhb += unbond.amount;
                self.events.push(
                    Event::new("stake.unbondReleased")
                        .with("address", address.to_string())
                        .with("amount", unbond.amount.to_string()),
                );
            }
            self.state.put_account(&address, account);
        }

        let record = self.state.get_reward_index();
        let updated = reward::update_global_index(record, timestamp, self.config.apr_bps);
        self.state.set_reward_index(updated);
    }

    /// Applies one transaction against a scratch copy of state, committing
    /// the copy back only if every step succeeds. `day` is the caller's
    /// already-formatted UTC calendar day (`"YYYY-MM-DD"`), used for the
    /// sponsorship throttle buckets.
    pub fn apply_transaction(
        &mut self,
        tx: &Transaction,
        height: u64,
        now: u64,
        day: &str,
    ) -> Result<Vec<Event>> {
        if tx.chain_id != self.config.chain_id {
            return Err(ProcessorError::ChainMismatch);
        }
        let sender = nhb_signature::recover_sender(tx)?;

        let mut scratch = self.state.copy();
        let mut events = Vec::new();

        let mut sender_account = scratch.get_account(&sender);
        if sender_account.nonce != tx.nonce {
            return Err(ProcessorError::NonceMismatch { expected: sender_account.nonce, got: tx.nonce });
        }

        if let Some(module) = quota_module(tx) {
            let bucket = scratch.get_quota_epoch().bucket;
            if !scratch.check_and_record(&sender, module, bucket, self.config.quota.max_requests_per_min) {
                return Err(ProcessorError::QuotaExceeded { module: module.to_string() });
            }
        }

        let gas_cost = Amount::from(tx.gas_limit) * tx.gas_price;
        self.charge_gas(&mut scratch, tx, sender, gas_cost, now, day, &mut events)?;

        self.dispatch(&mut scratch, tx, sender, height, now, &mut events)?;

        sender_account = scratch.get_account(&sender);
        sender_account.nonce += 1;
        scratch.put_account(&sender, sender_account);

        self.state = scratch;
        for event in &events {
            self.events.push(event.clone());
        }
        Ok(events)
    }

    fn charge_gas(
        &self,
        scratch: &mut nhb_state::State<D>,
        tx: &Transaction,
        sender: Address,
        gas_cost: Amount,
        now: u64,
        day: &str,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let Some(paymaster) = tx.paymaster else {
            let balance = scratch.get_balance(&sender, "NHB");
            if balance < gas_cost {
                return Err(ProcessorError::InsufficientFundsForGas);
            }
            scratch.set_balance(&sender, "NHB", balance - gas_cost);
            return Ok(());
        };

        let recovered = nhb_signature::recover_paymaster(tx)
            .ok_or_else(|| ProcessorError::SponsorshipRejected("paymaster co-signature missing".to_string()))??;
        if recovered != paymaster {
            return Err(ProcessorError::SponsorshipRejected("paymaster co-signature mismatch".to_string()));
        }

        let (merchant_id, device_id) = sponsorship_scope(tx);
        let assess = |state: &nhb_state::State<D>| {
            sponsorship::evaluate_sponsorship(
                state,
                paymaster,
                merchant_id.as_deref(),
                device_id.as_deref(),
                gas_cost,
                day,
                &self.config.throttles,
            )
        };

        let mut assessment = assess(scratch);
        if matches!(assessment, SponsorshipAssessment::InsufficientBalance) {
            if let Some(policy) = &self.config.auto_topup {
                let outcome = sponsorship::attempt_auto_topup(
                    scratch,
                    policy,
                    paymaster,
                    AutoTopupContext::default(),
                    now,
                    day,
                );
                if let sponsorship::TopupOutcome::Success { minted } = outcome {
                    events.push(
                        Event::new("paymaster.autoTopUp")
                            .with("paymaster", paymaster.to_string())
                            .with("amount", minted.to_string()),
                    );
                    assessment = assess(scratch);
                }
            }
        }

        match assessment {
            SponsorshipAssessment::Ready => {
                let balance = scratch.get_balance(&paymaster, "NHB");
                scratch.set_balance(&paymaster, "NHB", balance - gas_cost);
                sponsorship::record_sponsorship_usage(
                    scratch,
                    paymaster,
                    merchant_id.as_deref(),
                    device_id.as_deref(),
                    gas_cost,
                    day,
                );
                Ok(())
            }
            SponsorshipAssessment::Throttled { scope, reason } => {
                Err(ProcessorError::SponsorshipRejected(format!("{scope} throttle: {reason}")))
            }
            SponsorshipAssessment::InsufficientBalance => Err(ProcessorError::InsufficientFundsForGas),
            SponsorshipAssessment::Rejected { reason } => Err(ProcessorError::SponsorshipRejected(reason)),
        }
    }

    fn dispatch(
        &self,
        scratch: &mut nhb_state::State<D>,
        tx: &Transaction,
        sender: Address,
        height: u64,
        now: u64,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        match tx.tx_type {
            TxType::Transfer => {
                let to = tx.to.ok_or(ProcessorError::MissingRecipient)?;
                transfer_native(scratch, sender, to, "NHB", tx.value, events)?;
            }
            TxType::TransferZNHB => {
                let to = tx.to.ok_or(ProcessorError::MissingRecipient)?;
                transfer_native(scratch, sender, to, "ZNHB", tx.value, events)?;
            }
            TxType::Delegate => {
                let payload: DelegatePayload = payload::decode(&tx.data)?;
                let balance = scratch.get_balance(&sender, "ZNHB");
                if balance < payload.amount {
                    return Err(ProcessorError::InsufficientBalance);
                }
                scratch.set_balance(&sender, "ZNHB", balance - payload.amount);
                let mut account = scratch.get_account(&sender);
                account.stake += payload.amount;
                account.stake_shares += payload.amount;
                account.delegated_validator = Some(payload.validator);
                scratch.put_account(&sender, account);
                events.push(
                    Event::new("stake.delegated")
                        .with("address", sender.to_string())
                        .with("validator", payload.validator.to_string())
                        .with("amount", payload.amount.to_string()),
                );
            }
            TxType::Undelegate => {
                let payload: UndelegatePayload = payload::decode(&tx.data)?;
                let mut account = scratch.get_account(&sender);
                if account.stake < payload.amount {
                    return Err(ProcessorError::NothingStaked);
                }
                account.stake -= payload.amount;
                account.stake_shares = account.stake_shares.saturating_sub(payload.amount);
                account.locked_znhb += payload.amount;
                let release_height = height + self.config.unbond_delay_blocks;
                account.pending_unbonds.push(PendingUnbond { amount: payload.amount, release_height });
                scratch.put_account(&sender, account);
                scratch.track_pending_unbond(&sender);
                events.push(
                    Event::new("stake.undelegated")
                        .with("address", sender.to_string())
                        .with("amount", payload.amount.to_string()),
                );
            }
            TxType::ClaimRewards => {
                let index = scratch.get_reward_index().index;
                let last = scratch.get_last_claimed_index(&sender);
                let account = scratch.get_account(&sender);
                let owed = reward::rewards_owed(account.stake_shares, last, index);
                if owed.is_zero() {
                    return Err(ProcessorError::NoRewards);
                }
                let mut account = account;
                account.balance_znhb += owed;
                scratch.put_account(&sender, account);
                scratch.set_last_claimed_index(&sender, index);
                events.push(
                    Event::new("stake.rewardsClaimed")
                        .with("address", sender.to_string())
                        .with("amount", owed.to_string()),
                );
            }
            TxType::RegisterValidator => {
                let payload: RegisterValidatorPayload = payload::decode(&tx.data)?;
                let account = scratch.get_account(&sender);
                if account.stake.is_zero() {
                    return Err(ProcessorError::NothingStaked);
                }
                let mut entries = scratch.load_validator_set();
                entries.retain(|e| e.address != sender);
                entries.push(nhb_state::validator_set::ValidatorEntry {
                    address: sender,
                    power: account.stake.low_u64(),
                    moniker: payload.moniker.clone(),
                    pubkey: payload.pubkey,
                });
                scratch.write_validator_set(entries);
                events.push(
                    Event::new("validator.registered")
                        .with("address", sender.to_string())
                        .with("moniker", payload.moniker),
                );
            }
            TxType::SetAlias => {
                let payload: SetAliasPayload = payload::decode(&tx.data)?;
                if payload.alias.is_empty() {
                    if let Some(existing) = scratch.alias_for_address(&sender) {
                        scratch.remove_address(&existing, &sender)?;
                    }
                } else {
                    scratch.set_alias(sender, &payload.alias)?;
                }
                events.push(
                    Event::new("identity.aliasSet")
                        .with("address", sender.to_string())
                        .with("alias", payload.alias),
                );
            }
            TxType::PosAuthorize => {
                let payload: PosAuthorizePayload = payload::decode(&tx.data)?;
                let merchant = scratch
                    .get_merchant(&payload.merchant_id)
                    .ok_or_else(|| ProcessorError::SponsorshipRejected("unknown merchant".to_string()))?;
                if merchant.paused {
                    return Err(ProcessorError::MerchantPaused);
                }
                let balance = scratch.get_balance(&sender, "NHB");
                if balance < payload.amount {
                    return Err(ProcessorError::InsufficientBalance);
                }
                scratch.set_balance(&sender, "NHB", balance - payload.amount);
                let owner_balance = scratch.get_balance(&merchant.owner, "NHB");
                scratch.set_balance(&merchant.owner, "NHB", owner_balance + payload.amount);
                events.push(
                    Event::new("payments.authorized")
                        .with("payer", sender.to_string())
                        .with("merchant_id", payload.merchant_id)
                        .with("amount", payload.amount.to_string()),
                );
            }
            TxType::CreateClaimable => {
                let payload: CreateClaimablePayload = payload::decode(&tx.data)?;
                let balance = scratch.get_balance(&sender, &payload.token);
                if balance < payload.amount {
                    return Err(ProcessorError::InsufficientBalance);
                }
                scratch.set_balance(&sender, &payload.token, balance - payload.amount);
                scratch.create_claimable(
                    payload.id,
                    sender,
                    &payload.token,
                    payload.amount,
                    payload.hash_lock,
                    payload.recipient_hint,
                    payload.deadline,
                    now,
                )?;
                events.push(
                    Event::new("claimable.created")
                        .with("id", hex::encode(payload.id))
                        .with("payer", sender.to_string())
                        .with("amount", payload.amount.to_string()),
                );
            }
            TxType::RedeemClaimable => {
                let payload: RedeemClaimablePayload = payload::decode(&tx.data)?;
                let claimable = scratch.claim_claimable(&payload.id, &payload.preimage, now)?;
                let balance = scratch.get_balance(&sender, &claimable.token);
                scratch.set_balance(&sender, &claimable.token, balance + claimable.amount);
                events.push(
                    Event::new("claimable.redeemed")
                        .with("id", hex::encode(payload.id))
                        .with("redeemer", sender.to_string())
                        .with("amount", claimable.amount.to_string()),
                );
            }
            TxType::Heartbeat => {
                let mut account = scratch.get_account(&sender);
                account.engagement_score += 1;
                let score = account.engagement_score;
                scratch.put_account(&sender, account);
                events.push(
                    Event::new("potso.heartbeat")
                        .with("address", sender.to_string())
                        .with("engagement_score", score.to_string()),
                );
            }
            TxType::CancelClaimable => {
                let payload: CancelClaimablePayload = payload::decode(&tx.data)?;
                let claimable = scratch.cancel_claimable(&payload.id, &sender)?;
                let balance = scratch.get_balance(&sender, &claimable.token);
                scratch.set_balance(&sender, &claimable.token, balance + claimable.amount);
                events.push(
                    Event::new("claimable.cancelled")
                        .with("id", hex::encode(payload.id))
                        .with("payer", sender.to_string())
                        .with("amount", claimable.amount.to_string()),
                );
            }
            TxType::JoinLoyaltyProgram => {
                let payload: JoinLoyaltyProgramPayload = payload::decode(&tx.data)?;
                let program = scratch
                    .get_loyalty_program(&payload.program_id)
                    .ok_or_else(|| ProcessorError::SponsorshipRejected("unknown loyalty program".to_string()))?;
                if program.paused {
                    return Err(ProcessorError::SponsorshipRejected("loyalty program paused".to_string()));
                }
                events.push(
                    Event::new("loyalty.program.joined")
                        .with("address", sender.to_string())
                        .with("program_id", payload.program_id),
                );
            }
        }
        Ok(())
    }

    /// Flushes the block's accumulated events, rolls the quota epoch over
    /// if `EpochSeconds` has elapsed, and persists this block's share of
    /// any outstanding per-epoch reward pools (§4.6).
    pub fn end_block(&mut self, height: u64, now: u64) -> Vec<Event> {
        self.rollover_quota_epoch(now);
        self.persist_reward_accrual(height);
        std::mem::take(&mut self.events).drain()
    }

    fn rollover_quota_epoch(&mut self, now: u64) {
        let mut record = self.state.get_quota_epoch();
        if record.started_at == 0 || now.saturating_sub(record.started_at) >= self.config.quota.epoch_seconds {
            record.bucket += 1;
            record.started_at = now;
            self.state.set_quota_epoch(record);
        }
    }

    /// Credits active validators' ZNHB balance with their share of the
    /// current epoch's `validators_pool`/`engagement_pool`, split evenly
    /// across validators and proportionally to `engagement_score`
    /// respectively. `stakers_pool` is not settled here: it is paid out
    /// through the continuous APR index/`ClaimRewards`, the only mechanism
    /// with a notion of "total stake" to divide it against.
    fn persist_reward_accrual(&mut self, height: u64) {
        let current = self.state.get_current_epoch();
        let accrual = self.state.get_epoch_accrual(current.epoch);
        if accrual.validators_pool.is_zero() && accrual.engagement_pool.is_zero() {
            return;
        }
        let validators = self.state.load_validator_set();
        if validators.is_empty() {
            return;
        }

        let block_index = height.saturating_sub(current.start_height);
        let validators_share = reward::per_block_share(accrual.validators_pool, self.config.epoch.length, block_index);
        let engagement_share = reward::per_block_share(accrual.engagement_pool, self.config.epoch.length, block_index);

        if !validators_share.is_zero() {
            let per_validator = validators_share / Amount::from(validators.len() as u64);
            for entry in &validators {
                let mut account = self.state.get_account(&entry.address);
                account.balance_znhb += per_validator;
                self.state.put_account(&entry.address, account);
            }
        }

        if !engagement_share.is_zero() {
            let total_engagement: u64 = validators
                .iter()
                .map(|entry| self.state.get_account(&entry.address).engagement_score)
                .sum();
            if total_engagement > 0 {
                for entry in &validators {
                    let mut account = self.state.get_account(&entry.address);
                    if account.engagement_score == 0 {
                        continue;
                    }
                    let share = engagement_share * Amount::from(account.engagement_score) / Amount::from(total_engagement);
                    account.balance_znhb += share;
                    self.state.put_account(&entry.address, account);
                }
            }
        }
    }

    /// Detects an epoch boundary and, if crossed, snapshots the validator
    /// set by composite weight and rotates the active set.
    pub fn process_block_lifecycle(
        &mut self,
        height: u64,
        candidates: &[crate::epoch::Candidate],
    ) -> Vec<Event> {
        let mut current = self.state.get_current_epoch();
        if current.epoch != 0 && height < current.start_height + self.config.epoch.length {
            return Vec::new();
        }
        if current.epoch == 0 && current.start_height == 0 && height < self.config.epoch.length {
            return Vec::new();
        }

        let snapshot = crate::epoch::snapshot(candidates, &self.config.epoch);
        let active = crate::epoch::active_set(&snapshot, &self.config.epoch);
        let mut events = crate::epoch::rotation_events(current.epoch, &active);

        if self.config.epoch.rotation_enabled {
            let entries = active
                .iter()
                .map(|v| nhb_state::validator_set::ValidatorEntry {
                    address: v.address,
                    power: v.weight.low_u64(),
                    moniker: String::new(),
                    pubkey: Vec::new(),
                })
                .collect();
            self.state.write_validator_set(entries);
        }

        let scheduled = reward::scheduled_emission(&self.config.emission_steps, current.epoch);
        let epoch_pool = reward::apply_caps(
            scheduled,
            self.config.epoch_cap,
            self.config.global_cap,
            self.state.get_minted_so_far("ZNHB"),
        );
        if let Ok(outcome) = epoch_pool {
            if let Some(event) = reward::cap_hit_event(current.epoch, scheduled, &outcome) {
                events.push(event);
            }
            let split = reward::split_pool(outcome.pool, self.config.validators_bps, self.config.stakers_bps);
            self.state.set_epoch_accrual(current.epoch, nhb_state::reward::EpochPoolAccrual {
                validators_pool: split.validators_pool,
                stakers_pool: split.stakers_pool,
                engagement_pool: split.engagement_pool,
            });
            self.state.add_minted("ZNHB", outcome.pool);
        }

        current.epoch += 1;
        current.start_height = height;
        self.state.set_current_epoch(current);
        events
    }
}

/// Shared `Transfer`/`TransferZNHB` body: debits `sender`, credits `to`,
/// both in `symbol`, and emits one `transfer.native` event naming which
/// token moved.
fn transfer_native<D: TrieDb + Clone>(
    scratch: &mut nhb_state::State<D>,
    sender: Address,
    to: Address,
    symbol: &str,
    amount: Amount,
    events: &mut Vec<Event>,
) -> Result<()> {
    let balance = scratch.get_balance(&sender, symbol);
    if balance < amount {
        return Err(ProcessorError::InsufficientBalance);
    }
    scratch.set_balance(&sender, symbol, balance - amount);
    let recipient_balance = scratch.get_balance(&to, symbol);
    scratch.set_balance(&to, symbol, recipient_balance + amount);
    events.push(
        Event::new("transfer.native")
            .with("from", sender.to_string())
            .with("to", to.to_string())
            .with("token", symbol.to_string())
            .with("amount", amount.to_string()),
    );
    Ok(())
}

/// Maps a transaction to the quota module bucket it counts against, if any.
/// Most operations are unmetered; point-of-sale authorization is the
/// concrete quota-bearing case the spec names.
fn quota_module(tx: &Transaction) -> Option<&'static str> {
    match tx.tx_type {
        TxType::PosAuthorize => Some("pos"),
        _ => None,
    }
}

/// `PosAuthorize` is the only operation whose payload names a merchant/device
/// scope the sponsorship throttles can key on; every other sponsored
/// transaction only ever hits the paymaster/global throttle tiers.
fn sponsorship_scope(tx: &Transaction) -> (Option<String>, Option<String>) {
    if !matches!(tx.tx_type, TxType::PosAuthorize) {
        return (None, None);
    }
    match payload::decode::<PosAuthorizePayload>(&tx.data) {
        Ok(payload) => (Some(payload.merchant_id), payload.device_id),
        Err(_) => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhb_trie::MemoryTrieDb;
    use shared_crypto::Secp256k1KeyPair;

    fn limits() -> ThrottleLimits {
        ThrottleLimits {
            per_paymaster_daily: Amount::from(1_000_000u64),
            per_merchant_daily: Amount::from(1_000_000u64),
            per_device_daily: Amount::from(1_000_000u64),
            per_device_daily_tx_count: 1_000,
            global_daily: Amount::from(10_000_000u64),
        }
    }

    fn config() -> ProcessorConfig {
        ProcessorConfig {
            chain_id: ChainId(7),
            apr_bps: 500,
            validators_bps: 5_000,
            stakers_bps: 4_000,
            epoch: EpochConfig { length: 100, stake_weight: 1, engagement_weight: 1, max_validators: 4, rotation_enabled: true },
            emission_steps: vec![],
            epoch_cap: None,
            global_cap: None,
            throttles: limits(),
            auto_topup: None,
            unbond_delay_blocks: 10,
            quota: QuotaConfig { max_requests_per_min: 5, epoch_seconds: 60 },
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
        let digest = tx.signing_digest();
        tx.signature = key.sign(&digest);
        tx
    }

    #[test]
    fn transfer_moves_balance_and_bumps_nonce() {
        let mut state = nhb_state::State::<MemoryTrieDb>::new();
        let key = Secp256k1KeyPair::generate();
        let sender = Address(key.address());
        let to = Address([0xAA; 20]);
        state.set_balance(&sender, "NHB", Amount::from(100_000u64));

        let mut processor = StateProcessor::new(state, config()).unwrap();
        let tx = signed_transfer(&key, 0, to, Amount::from(1_000u64));
        processor.apply_transaction(&tx, 1, 1_000, "2026-07-26").unwrap();

        assert_eq!(processor.state.get_balance(&to, "NHB"), Amount::from(1_000u64));
        assert_eq!(processor.state.get_account(&sender).nonce, 1);
    }

    #[test]
    fn wrong_nonce_is_rejected_and_nothing_moves() {
        let mut state = nhb_state::State::<MemoryTrieDb>::new();
        let key = Secp256k1KeyPair::generate();
        let sender = Address(key.address());
        state.set_balance(&sender, "NHB", Amount::from(100_000u64));

        let mut processor = StateProcessor::new(state, config()).unwrap();
        let tx = signed_transfer(&key, 5, Address([0xAA; 20]), Amount::from(1_000u64));
        let err = processor.apply_transaction(&tx, 1, 1_000, "2026-07-26").unwrap_err();
        assert!(matches!(err, ProcessorError::NonceMismatch { expected: 0, got: 5 }));
        assert!(processor.state.get_balance(&Address([0xAA; 20]), "NHB").is_zero());
    }

    #[test]
    fn insufficient_gas_funds_rejects_before_any_mutation() {
        let state = nhb_state::State::<MemoryTrieDb>::new();
        let key = Secp256k1KeyPair::generate();
        let mut processor = StateProcessor::new(state, config()).unwrap();
        let tx = signed_transfer(&key, 0, Address([0xAA; 20]), Amount::from(1_000u64));
        let err = processor.apply_transaction(&tx, 1, 1_000, "2026-07-26").unwrap_err();
        assert!(matches!(err, ProcessorError::InsufficientFundsForGas));
    }

    #[test]
    fn delegate_then_claim_rewards_after_index_accrues() {
        let mut state = nhb_state::State::<MemoryTrieDb>::new();
        let key = Secp256k1KeyPair::generate();
        let sender = Address(key.address());
        state.set_balance(&sender, "NHB", Amount::from(1_000_000u64));
        state.set_balance(&sender, "ZNHB", Amount::from(10_000u64));

        let mut processor = StateProcessor::new(state, config()).unwrap();
        processor.begin_block(1, 1);

        let delegate_payload = DelegatePayload { validator: Address([0x01; 20]), amount: Amount::from(5_000u64) };
        let mut tx = Transaction {
            chain_id: ChainId(7),
            tx_type: TxType::Delegate,
            nonce: 0,
            to: None,
            value: Amount::zero(),
            gas_limit: 21_000,
            gas_price: Amount::from(1u64),
            data: bincode::serialize(&delegate_payload).unwrap(),
            paymaster: None,
            paymaster_signature: None,
            signature: shared_crypto::Secp256k1Signature::from_parts([0; 32], [0; 32], 27),
            merchant_address: None,
        };
        tx.signature = key.sign(&tx.signing_digest());
        processor.apply_transaction(&tx, 1, 1, "2026-07-26").unwrap();
        assert_eq!(processor.state.get_account(&sender).stake, Amount::from(5_000u64));

        processor.begin_block(2, 1 + 365 * 24 * 60 * 60 / 2);

        let mut claim_tx = Transaction {
            chain_id: ChainId(7),
            tx_type: TxType::ClaimRewards,
            nonce: 1,
            to: None,
            value: Amount::zero(),
            gas_limit: 21_000,
            gas_price: Amount::from(1u64),
            data: vec![],
            paymaster: None,
            paymaster_signature: None,
            signature: shared_crypto::Secp256k1Signature::from_parts([0; 32], [0; 32], 27),
            merchant_address: None,
        };
        claim_tx.signature = key.sign(&claim_tx.signing_digest());
        let events = processor
            .apply_transaction(&claim_tx, 2, 1 + 365 * 24 * 60 * 60 / 2, "2026-07-26")
            .unwrap();
        assert!(events.iter().any(|e| e.event_type == "stake.rewardsClaimed"));
    }

    #[test]
    fn undelegate_then_begin_block_releases_after_the_delay() {
        let mut state = nhb_state::State::<MemoryTrieDb>::new();
        let key = Secp256k1KeyPair::generate();
        let sender = Address(key.address());
        state.set_balance(&sender, "NHB", Amount::from(1_000_000u64));
        let mut account = state.get_account(&sender);
        account.stake = Amount::from(5_000u64);
        account.stake_shares = Amount::from(5_000u64);
        state.put_account(&sender, account);

        let mut processor = StateProcessor::new(state, config()).unwrap();
        processor.begin_block(1, 1);

        let undelegate_payload = UndelegatePayload { amount: Amount::from(2_000u64) };
        let mut tx = Transaction {
            chain_id: ChainId(7),
            tx_type: TxType::Undelegate,
            nonce: 0,
            to: None,
            value: Amount::zero(),
            gas_limit: 21_000,
            gas_price: Amount::from(1u64),
            data: bincode::serialize(&undelegate_payload).unwrap(),
            paymaster: None,
            paymaster_signature: None,
            signature: shared_crypto::Secp256k1Signature::from_parts([0; 32], [0; 32], 27),
            merchant_address: None,
        };
        tx.signature = key.sign(&tx.signing_digest());
        processor.apply_transaction(&tx, 1, 1, "2026-07-26").unwrap();
        assert_eq!(processor.state.get_account(&sender).locked_znhb, Amount::from(2_000u64));

        processor.begin_block(11, 2);
        let account = processor.state.get_account(&sender);
        assert!(account.pending_unbonds.is_empty());
        assert_eq!(account.balance_znhb, Amount::from(2_000u64));
        assert_eq!(account.locked_znhb, Amount::zero());
    }

    #[test]
    fn sponsored_transaction_debits_the_paymaster_not_the_sender() {
        let mut state = nhb_state::State::<MemoryTrieDb>::new();
        let sender_key = Secp256k1KeyPair::generate();
        let paymaster_key = Secp256k1KeyPair::generate();
        let sender = Address(sender_key.address());
        let paymaster = Address(paymaster_key.address());
        state.set_balance(&paymaster, "NHB", Amount::from(100_000u64));

        let mut processor = StateProcessor::new(state, config()).unwrap();
        let mut tx = Transaction {
            chain_id: ChainId(7),
            tx_type: TxType::Transfer,
            nonce: 0,
            to: Some(Address([0xAA; 20])),
            value: Amount::from(10u64),
            gas_limit: 21_000,
            gas_price: Amount::from(1u64),
            data: vec![],
            paymaster: Some(paymaster),
            paymaster_signature: None,
            signature: shared_crypto::Secp256k1Signature::from_parts([0; 32], [0; 32], 27),
            merchant_address: None,
        };
        let digest = tx.signing_digest();
        tx.signature = sender_key.sign(&digest);
        tx.paymaster_signature = Some(paymaster_key.sign(&digest));

        processor.apply_transaction(&tx, 1, 1_000, "2026-07-26").unwrap();
        assert_eq!(processor.state.get_balance(&paymaster, "NHB"), Amount::from(100_000u64 - 21_000));
        assert!(processor.state.get_balance(&sender, "NHB").is_zero());
    }

    #[test]
    fn process_block_lifecycle_rotates_once_the_epoch_elapses() {
        let state = nhb_state::State::<MemoryTrieDb>::new();
        let mut processor = StateProcessor::new(state, config()).unwrap();
        let candidates = vec![crate::epoch::Candidate {
            address: Address([0x01; 20]),
            stake: Amount::from(100u64),
            engagement: 0,
        }];
        assert!(processor.process_block_lifecycle(50, &candidates).is_empty());
        let events = processor.process_block_lifecycle(100, &candidates);
        assert!(events.iter().any(|e| e.event_type == "validators.rotated"));
        assert_eq!(processor.state.get_current_epoch().epoch, 1);
    }

    #[test]
    fn heartbeat_bumps_engagement_score_and_emits_event() {
        let mut state = nhb_state::State::<MemoryTrieDb>::new();
        let key = Secp256k1KeyPair::generate();
        let sender = Address(key.address());
        state.set_balance(&sender, "NHB", Amount::from(100_000u64));

        let mut processor = StateProcessor::new(state, config()).unwrap();
        let mut tx = Transaction {
            chain_id: ChainId(7),
            tx_type: TxType::Heartbeat,
            nonce: 0,
            to: None,
            value: Amount::zero(),
            gas_limit: 21_000,
            gas_price: Amount::from(1u64),
            data: vec![],
            paymaster: None,
            paymaster_signature: None,
            signature: shared_crypto::Secp256k1Signature::from_parts([0; 32], [0; 32], 27),
            merchant_address: None,
        };
        tx.signature = key.sign(&tx.signing_digest());
        let events = processor.apply_transaction(&tx, 1, 1_000, "2026-07-26").unwrap();

        assert_eq!(processor.state.get_account(&sender).engagement_score, 1);
        assert!(events.iter().any(|e| e.event_type == "potso.heartbeat"));
    }

    #[test]
    fn transfer_znhb_moves_znhb_balance_and_leaves_nhb_untouched() {
        let mut state = nhb_state::State::<MemoryTrieDb>::new();
        let key = Secp256k1KeyPair::generate();
        let sender = Address(key.address());
        let to = Address([0xAA; 20]);
        state.set_balance(&sender, "NHB", Amount::from(100_000u64));
        state.set_balance(&sender, "ZNHB", Amount::from(5_000u64));

        let mut processor = StateProcessor::new(state, config()).unwrap();
        let mut tx = Transaction {
            chain_id: ChainId(7),
            tx_type: TxType::TransferZNHB,
            nonce: 0,
            to: Some(to),
            value: Amount::from(2_000u64),
            gas_limit: 21_000,
            gas_price: Amount::from(1u64),
            data: vec![],
            paymaster: None,
            paymaster_signature: None,
            signature: shared_crypto::Secp256k1Signature::from_parts([0; 32], [0; 32], 27),
            merchant_address: None,
        };
        tx.signature = key.sign(&tx.signing_digest());
        processor.apply_transaction(&tx, 1, 1_000, "2026-07-26").unwrap();

        assert_eq!(processor.state.get_balance(&to, "ZNHB"), Amount::from(2_000u64));
        assert!(processor.state.get_balance(&to, "NHB").is_zero());
        assert_eq!(processor.state.get_balance(&sender, "ZNHB"), Amount::from(3_000u64));
    }

    #[test]
    fn cancel_claimable_refunds_the_payer() {
        let mut state = nhb_state::State::<MemoryTrieDb>::new();
        let key = Secp256k1KeyPair::generate();
        let sender = Address(key.address());
        state.set_balance(&sender, "NHB", Amount::from(100_000u64));

        let mut processor = StateProcessor::new(state, config()).unwrap();

        let claim_id: Hash = [0x42; 32];
        let create_payload = CreateClaimablePayload {
            id: claim_id,
            token: "NHB".to_string(),
            amount: Amount::from(1_000u64),
            hash_lock: [0x01; 32],
            recipient_hint: [0x00; 32],
            deadline: 10_000,
        };
        let mut create_tx = Transaction {
            chain_id: ChainId(7),
            tx_type: TxType::CreateClaimable,
            nonce: 0,
            to: None,
            value: Amount::zero(),
            gas_limit: 21_000,
            gas_price: Amount::from(1u64),
            data: bincode::serialize(&create_payload).unwrap(),
            paymaster: None,
            paymaster_signature: None,
            signature: shared_crypto::Secp256k1Signature::from_parts([0; 32], [0; 32], 27),
            merchant_address: None,
        };
        create_tx.signature = key.sign(&create_tx.signing_digest());
        processor.apply_transaction(&create_tx, 1, 1, "2026-07-26").unwrap();
        assert_eq!(processor.state.get_balance(&sender, "NHB"), Amount::from(99_000u64));

        let cancel_payload = CancelClaimablePayload { id: claim_id };
        let mut cancel_tx = Transaction {
            chain_id: ChainId(7),
            tx_type: TxType::CancelClaimable,
            nonce: 1,
            to: None,
            value: Amount::zero(),
            gas_limit: 21_000,
            gas_price: Amount::from(1u64),
            data: bincode::serialize(&cancel_payload).unwrap(),
            paymaster: None,
            paymaster_signature: None,
            signature: shared_crypto::Secp256k1Signature::from_parts([0; 32], [0; 32], 27),
            merchant_address: None,
        };
        cancel_tx.signature = key.sign(&cancel_tx.signing_digest());
        let events = processor.apply_transaction(&cancel_tx, 1, 1, "2026-07-26").unwrap();

        assert_eq!(processor.state.get_balance(&sender, "NHB"), Amount::from(100_000u64));
        assert!(events.iter().any(|e| e.event_type == "claimable.cancelled"));
    }

    #[test]
    fn quota_rejects_over_the_limit_without_bumping_nonce() {
        let mut state = nhb_state::State::<MemoryTrieDb>::new();
        let key = Secp256k1KeyPair::generate();
        let sender = Address(key.address());
        state.set_balance(&sender, "NHB", Amount::from(1_000_000u64));
        state.put_merchant(nhb_state::pos::MerchantRecord {
            merchant_id: "merchant-1".to_string(),
            owner: Address([0x55; 20]),
            paused: false,
        });

        let mut cfg = config();
        cfg.quota = QuotaConfig { max_requests_per_min: 1, epoch_seconds: 60 };
        let mut processor = StateProcessor::new(state, cfg).unwrap();

        let pos_payload = PosAuthorizePayload {
            merchant_id: "merchant-1".to_string(),
            device_id: None,
            amount: Amount::from(10u64),
        };
        let make_tx = |nonce: u64| {
            let mut tx = Transaction {
                chain_id: ChainId(7),
                tx_type: TxType::PosAuthorize,
                nonce,
                to: None,
                value: Amount::zero(),
                gas_limit: 21_000,
                gas_price: Amount::from(1u64),
                data: bincode::serialize(&pos_payload).unwrap(),
                paymaster: None,
                paymaster_signature: None,
                signature: shared_crypto::Secp256k1Signature::from_parts([0; 32], [0; 32], 27),
                merchant_address: None,
            };
            tx.signature = key.sign(&tx.signing_digest());
            tx
        };

        processor.apply_transaction(&make_tx(0), 1, 1_000, "2026-07-26").unwrap();
        assert_eq!(processor.state.get_account(&sender).nonce, 1);

        let rejected = processor.apply_transaction(&make_tx(1), 1, 1_000, "2026-07-26").unwrap_err();
        assert!(matches!(rejected, ProcessorError::QuotaExceeded { .. }));
        assert_eq!(processor.state.get_account(&sender).nonce, 1);
    }
}
