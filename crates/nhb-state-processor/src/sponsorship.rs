//! Paymaster sponsorship evaluation (§4.7): a short-circuiting pipeline of
//! scope checks, hierarchical daily throttles, a balance check, and an
//! optional auto-topup rescue. `evaluate_sponsorship` is pure — it never
//! mutates state or produces events, matching the spec's "those events are
//! only emitted from the apply path, never from a pure evaluation."
//! [`attempt_auto_topup`] is the one stage that does mutate, and only on its
//! own success path.

use nhb_trie::TrieDb;
use shared_types::{Address, Amount};

/// Hierarchical per-day spend ceilings, all denominated in NHB base units.
#[derive(Clone, Debug)]
pub struct ThrottleLimits {
    pub per_paymaster_daily: Amount,
    pub per_merchant_daily: Amount,
    pub per_device_daily: Amount,
    pub per_device_daily_tx_count: u64,
    pub global_daily: Amount,
}

#[derive(Clone, Debug)]
pub struct AutoTopupPolicy {
    pub min_balance: Amount,
    pub topup_amount: Amount,
    pub daily_cap: Amount,
    pub cooldown_secs: u64,
    pub minter_role: String,
    pub approver_role: String,
    pub funding_account: Address,
}

/// The minter/approver authorizing this particular topup attempt. Who holds
/// these identities is a policy-owner decision outside this crate's scope;
/// the processor supplies whatever the sponsoring paymaster's operator
/// configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoTopupContext {
    pub minter: Option<Address>,
    pub approver: Option<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SponsorshipAssessment {
    Ready,
    Throttled { scope: &'static str, reason: String },
    InsufficientBalance,
    Rejected { reason: String },
}

/// Evaluates stages 1-4 of §4.7's pipeline. Stage 1 (paymaster signature
/// recovery) happens one level up, in `nhb_signature::recover_paymaster`,
/// before this function is ever called.
pub fn evaluate_sponsorship<D: TrieDb + Clone>(
    state: &nhb_state::State<D>,
    paymaster: Address,
    merchant_id: Option<&str>,
    device_id: Option<&str>,
    gas_cost: Amount,
    day: &str,
    throttles: &ThrottleLimits,
) -> SponsorshipAssessment {
    if let Some(merchant_id) = merchant_id {
        if let Some(merchant) = state.get_merchant(merchant_id) {
            if merchant.paused {
                return SponsorshipAssessment::Rejected {
                    reason: "merchant sponsorship paused".to_string(),
                };
            }
        }
    }
    if let Some(device_id) = device_id {
        if let Some(device) = state.get_device(device_id) {
            if device.revoked {
                return SponsorshipAssessment::Rejected {
                    reason: "device sponsorship revoked".to_string(),
                };
            }
            if let Some(merchant_id) = merchant_id {
                if device.merchant_id != merchant_id {
                    return SponsorshipAssessment::Rejected {
                        reason: format!(
                            "device {} is bound to merchant {}, not {}",
                            device_id, device.merchant_id, merchant_id
                        ),
                    };
                }
            }
        }
    }

    let paymaster_id = paymaster.to_string();
    let paymaster_spend = state.get_spend("paymaster", &paymaster_id, day);
    if paymaster_spend.used + gas_cost > throttles.per_paymaster_daily {
        return SponsorshipAssessment::Throttled {
            scope: "paymaster",
            reason: "per-paymaster daily budget exceeded".to_string(),
        };
    }

    if let Some(merchant_id) = merchant_id {
        let merchant_spend = state.get_spend("merchant", merchant_id, day);
        if merchant_spend.used + gas_cost > throttles.per_merchant_daily {
            return SponsorshipAssessment::Throttled {
                scope: "merchant",
                reason: "per-merchant daily budget exceeded".to_string(),
            };
        }
    }

    if let Some(device_id) = device_id {
        let device_spend = state.get_spend("device", device_id, day);
        if device_spend.used + gas_cost > throttles.per_device_daily {
            return SponsorshipAssessment::Throttled {
                scope: "device",
                reason: "per-device daily budget exceeded".to_string(),
            };
        }
        if device_spend.tx_count + 1 > throttles.per_device_daily_tx_count {
            return SponsorshipAssessment::Throttled {
                scope: "device",
                reason: "per-device daily tx count exceeded".to_string(),
            };
        }
    }

    let global_spend = state.get_spend("global", "", day);
    if global_spend.used + gas_cost > throttles.global_daily {
        return SponsorshipAssessment::Throttled {
            scope: "global",
            reason: "global daily cap exceeded".to_string(),
        };
    }

    let balance = state.get_balance(&paymaster, "NHB");
    if balance < gas_cost {
        return SponsorshipAssessment::InsufficientBalance;
    }

    SponsorshipAssessment::Ready
}

/// Records throttle usage for an accepted sponsorship. Called only from the
/// apply path, and only once `evaluate_sponsorship` returned `Ready`.
pub fn record_sponsorship_usage<D: TrieDb + Clone>(
    state: &mut nhb_state::State<D>,
    paymaster: Address,
    merchant_id: Option<&str>,
    device_id: Option<&str>,
    gas_cost: Amount,
    day: &str,
) {
    state.record_spend("paymaster", &paymaster.to_string(), day, gas_cost);
    if let Some(merchant_id) = merchant_id {
        state.record_spend("merchant", merchant_id, day, gas_cost);
    }
    if let Some(device_id) = device_id {
        state.record_spend("device", device_id, day, gas_cost);
    }
    state.record_spend("global", "", day, gas_cost);
}

/// The six failure reason tokens §4.7 step 5 names explicitly.
pub const REASON_MINTER_MISSING: &str = "minter_missing";
pub const REASON_APPROVER_MISSING: &str = "approver_missing";
pub const REASON_MINTER_ROLE_MISSING: &str = "minter_role_missing";
pub const REASON_APPROVER_ROLE_MISSING: &str = "approver_role_missing";
pub const REASON_COOLDOWN_ACTIVE: &str = "cooldown_active";
pub const REASON_DAILY_CAP_EXCEEDED: &str = "daily_cap_exceeded";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopupOutcome {
    /// Balance was already at or above `min_balance`; no attempt was made.
    Skipped,
    Success { minted: Amount },
    Failure { reason: &'static str },
}

/// Stage 5: rescue a low paymaster balance by minting ZNHB from the policy's
/// funding account. Mutates state only on the `Success` path — every
/// `Failure` leaves state untouched, per the spec's "on failure, mutate no
/// state" requirement.
pub fn attempt_auto_topup<D: TrieDb + Clone>(
    state: &mut nhb_state::State<D>,
    policy: &AutoTopupPolicy,
    paymaster: Address,
    ctx: AutoTopupContext,
    now: u64,
    day: &str,
) -> TopupOutcome {
    let balance = state.get_balance(&paymaster, "NHB");
    if balance >= policy.min_balance {
        return TopupOutcome::Skipped;
    }

    let Some(minter) = ctx.minter else {
        return TopupOutcome::Failure { reason: REASON_MINTER_MISSING };
    };
    let Some(approver) = ctx.approver else {
        return TopupOutcome::Failure { reason: REASON_APPROVER_MISSING };
    };
    if minter == approver {
        return TopupOutcome::Failure { reason: REASON_APPROVER_MISSING };
    }
    if !state.has_role(&policy.minter_role, &minter) {
        return TopupOutcome::Failure { reason: REASON_MINTER_ROLE_MISSING };
    }
    if !state.has_role(&policy.approver_role, &approver) {
        return TopupOutcome::Failure { reason: REASON_APPROVER_ROLE_MISSING };
    }

    let record = state.get_topup_record(&paymaster);
    if record.last_topup_unix != 0 {
        let elapsed = now.saturating_sub(record.last_topup_unix);
        if elapsed < policy.cooldown_secs {
            return TopupOutcome::Failure { reason: REASON_COOLDOWN_ACTIVE };
        }
    }

    let minted_today = if record.day == day { record.minted_today } else { Amount::zero() };
    if minted_today + policy.topup_amount > policy.daily_cap {
        return TopupOutcome::Failure { reason: REASON_DAILY_CAP_EXCEEDED };
    }

    let funding_balance = state.get_balance(&policy.funding_account, "ZNHB");
    if funding_balance < policy.topup_amount {
        // Not one of §4.7's named tokens: the policy is assumed funded, so
        // this is treated as the cap being effectively exhausted.
        return TopupOutcome::Failure { reason: REASON_DAILY_CAP_EXCEEDED };
    }

    state.set_balance(&policy.funding_account, "ZNHB", funding_balance - policy.topup_amount);
    let paymaster_znhb = state.get_balance(&paymaster, "ZNHB");
    state.set_balance(&paymaster, "ZNHB", paymaster_znhb + policy.topup_amount);
    state.put_topup_record(
        &paymaster,
        nhb_state::paymaster::TopUpRecord {
            last_topup_unix: now,
            minted_today: minted_today + policy.topup_amount,
            day: day.to_string(),
        },
    );
    TopupOutcome::Success { minted: policy.topup_amount }
}
