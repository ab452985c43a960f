//! Reward engine (§4.4): global APR-driven index accrual, per-epoch pool
//! splits with remainder distribution, emission schedule lookup with
//! optional geometric decay, and cap semantics. The persisted numbers these
//! functions read and write live in [`nhb_state::reward`]; everything here
//! is pure so it can be exercised without a trie.

use shared_types::{Amount, Event};

use crate::errors::{ProcessorError, Result};

/// Fixed-point denominator for the reward index (spec.md §4.4: "unbounded
/// ≥ 1e18").
pub const INDEX_PRECISION: u64 = 1_000_000_000_000_000_000;
const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;
const BPS_DENOMINATOR: u64 = 10_000;

/// `UpdateGlobalIndex(block_ts, apr_bps)`. APR accrues simply (not
/// compounded); a non-increasing timestamp never moves the index backward,
/// it only resyncs `last_update`.
pub fn update_global_index(
    mut record: nhb_state::reward::RewardIndexRecord,
    ts: u64,
    apr_bps: u64,
) -> nhb_state::reward::RewardIndexRecord {
    if record.last_update == 0 {
        record.last_update = ts;
        return record;
    }
    if ts <= record.last_update {
        record.last_update = ts;
        return record;
    }
    let delta = ts - record.last_update;
    let increment = Amount::from(delta) * Amount::from(apr_bps) * Amount::from(INDEX_PRECISION)
        / (Amount::from(SECONDS_PER_YEAR) * Amount::from(BPS_DENOMINATOR));
    record.index += increment;
    record.last_update = ts;
    record
}

/// Basis-point split of one emitted pool into validators/stakers/engagement.
/// `engagement_pool` absorbs whatever flooring dust the other two shares
/// leave behind, so `validators_pool + stakers_pool + engagement_pool ==
/// pool` exactly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolSplit {
    pub validators_pool: Amount,
    pub stakers_pool: Amount,
    pub engagement_pool: Amount,
}

pub fn split_pool(pool: Amount, validators_bps: u64, stakers_bps: u64) -> PoolSplit {
    let validators_pool = pool * Amount::from(validators_bps) / Amount::from(BPS_DENOMINATOR);
    let stakers_pool = pool * Amount::from(stakers_bps) / Amount::from(BPS_DENOMINATOR);
    let engagement_pool = pool - validators_pool - stakers_pool;
    PoolSplit {
        validators_pool,
        stakers_pool,
        engagement_pool,
    }
}

/// One pool's per-block share within an epoch of `epoch_length` blocks: the
/// floor `pool / epoch_length`, plus one extra unit for each of the first
/// `pool % epoch_length` blocks so the epoch sums to exactly `pool`.
pub fn per_block_share(pool: Amount, epoch_length: u64, block_index_in_epoch: u64) -> Amount {
    if epoch_length == 0 {
        return Amount::zero();
    }
    let length = Amount::from(epoch_length);
    let base = pool / length;
    let remainder = (pool % length).as_u64();
    if block_index_in_epoch < remainder {
        base + Amount::from(1u64)
    } else {
        base
    }
}

/// One step of the emission schedule: `amount` NHB/ZNHB-equivalent minted
/// per epoch from `start_epoch` onward, until a later step supersedes it.
#[derive(Clone, Debug)]
pub struct EmissionStep {
    pub start_epoch: u64,
    pub amount: Amount,
    pub decay: Option<EmissionDecay>,
}

#[derive(Clone, Copy, Debug)]
pub struct EmissionDecay {
    /// `(ratio_bps / 10_000)` applied once per elapsed epoch.
    pub ratio_bps: u64,
    /// Decay stops advancing past this many elapsed epochs.
    pub duration: u64,
    pub minimum: Option<Amount>,
}

/// Looks up the highest `start_epoch <= current_epoch` step and applies its
/// optional geometric decay.
pub fn scheduled_emission(steps: &[EmissionStep], current_epoch: u64) -> Amount {
    let step = steps
        .iter()
        .filter(|s| s.start_epoch <= current_epoch)
        .max_by_key(|s| s.start_epoch);
    let Some(step) = step else {
        return Amount::zero();
    };
    let mut amount = step.amount;
    if let Some(decay) = step.decay {
        let elapsed = current_epoch - step.start_epoch;
        let n = elapsed.min(decay.duration);
        for _ in 0..n {
            amount = amount * Amount::from(decay.ratio_bps) / Amount::from(BPS_DENOMINATOR);
        }
        if let Some(minimum) = decay.minimum {
            if amount < minimum {
                amount = minimum;
            }
        }
    }
    amount
}

/// Result of [`apply_caps`]: the pool actually available this epoch and the
/// global headroom left after minting it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapOutcome {
    pub pool: Amount,
    pub remaining_after: Amount,
    pub capped: bool,
}

/// `pool = min(scheduled, epoch_cap, remaining)` where `remaining =
/// global_cap - minted_so_far`. Errors if `minted_so_far` has already
/// overrun `global_cap` (a precondition violation, not a normal rejection).
pub fn apply_caps(
    scheduled: Amount,
    epoch_cap: Option<Amount>,
    global_cap: Option<Amount>,
    minted_so_far: Amount,
) -> Result<CapOutcome> {
    let remaining = match global_cap {
        Some(cap) => {
            if minted_so_far > cap {
                return Err(ProcessorError::EmissionCapExceeded {
                    minted: minted_so_far.to_string(),
                    cap: cap.to_string(),
                });
            }
            Some(cap - minted_so_far)
        }
        None => None,
    };

    let mut pool = scheduled;
    if let Some(cap) = epoch_cap {
        pool = pool.min(cap);
    }
    if let Some(rem) = remaining {
        pool = pool.min(rem);
    }
    let remaining_after = remaining.map(|rem| rem - pool).unwrap_or(Amount::zero());
    let capped = pool < scheduled;
    Ok(CapOutcome {
        pool,
        remaining_after,
        capped,
    })
}

/// The sole successor to the legacy `TypeStakeCapHit`/`TypeStakeEmissionCapHit`
/// pair (spec.md §9 Open Question) — emitted whenever a cap actually bound
/// the scheduled emission down.
pub fn cap_hit_event(epoch: u64, scheduled: Amount, outcome: &CapOutcome) -> Option<Event> {
    if !outcome.capped {
        return None;
    }
    Some(
        Event::new("stake.emissionCapHit")
            .with("epoch", epoch.to_string())
            .with("scheduled", scheduled.to_string())
            .with("pool", outcome.pool.to_string()),
    )
}

/// Rewards owed to an account holding `stake_shares` since it last claimed
/// at `last_claimed_index`, against the current global `index`.
pub fn rewards_owed(stake_shares: Amount, last_claimed_index: Amount, index: Amount) -> Amount {
    if index <= last_claimed_index {
        return Amount::zero();
    }
    let delta = index - last_claimed_index;
    stake_shares * delta / Amount::from(INDEX_PRECISION)
}
