//! Epoch manager (§4.5): composite validator weighting, a descending-weight
//! snapshot with hex-ascending tie-break, and rotation into the active set.

use shared_types::{Address, Amount, Event};

use crate::errors::{ProcessorError, Result};

#[derive(Clone, Copy, Debug)]
pub struct EpochConfig {
    pub length: u64,
    pub stake_weight: u64,
    pub engagement_weight: u64,
    pub max_validators: u64,
    pub rotation_enabled: bool,
}

impl EpochConfig {
    pub fn validate(&self) -> Result<()> {
        if self.length == 0 {
            return Err(ProcessorError::InvalidEpochConfig("Length must be > 0".to_string()));
        }
        if self.stake_weight == 0 && self.engagement_weight == 0 {
            return Err(ProcessorError::InvalidEpochConfig(
                "stake_weight + engagement_weight must be > 0".to_string(),
            ));
        }
        if self.rotation_enabled && self.max_validators == 0 {
            return Err(ProcessorError::InvalidEpochConfig(
                "max_validators must be > 0 when rotation is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// A validator candidate's raw stake and engagement inputs before weighting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub address: Address,
    pub stake: Amount,
    pub engagement: u64,
}

/// `Weight_i = stake * stake_weight + engagement * engagement_weight`.
pub fn composite_weight(candidate: &Candidate, cfg: &EpochConfig) -> Amount {
    candidate.stake * Amount::from(cfg.stake_weight)
        + Amount::from(candidate.engagement) * Amount::from(cfg.engagement_weight)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeightedValidator {
    pub address: Address,
    pub weight: Amount,
}

/// Sorts descending by composite weight, tie-breaking on hex-ascending
/// address (equivalent here to the address's own byte ordering).
pub fn snapshot(candidates: &[Candidate], cfg: &EpochConfig) -> Vec<WeightedValidator> {
    let mut weighted: Vec<WeightedValidator> = candidates
        .iter()
        .map(|c| WeightedValidator { address: c.address, weight: composite_weight(c, cfg) })
        .collect();
    weighted.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.address.cmp(&b.address)));
    weighted
}

/// The top `max_validators` entries of a snapshot become the active set.
pub fn active_set(snapshot: &[WeightedValidator], cfg: &EpochConfig) -> Vec<WeightedValidator> {
    snapshot.iter().take(cfg.max_validators as usize).copied().collect()
}

/// `validators.rotated` + `epoch.finalized`, both with base-10 integer
/// attributes and `total_weight` as a decimal string.
pub fn rotation_events(epoch: u64, active: &[WeightedValidator]) -> Vec<Event> {
    let total_weight = active
        .iter()
        .fold(Amount::zero(), |acc, v| acc + v.weight);
    let validators = active
        .iter()
        .map(|v| v.address.to_bech32_nhb())
        .collect::<Vec<_>>()
        .join(",");
    vec![
        Event::new("validators.rotated")
            .with("epoch", epoch.to_string())
            .with("count", active.len().to_string())
            .with("validators", validators),
        Event::new("epoch.finalized")
            .with("epoch", epoch.to_string())
            .with("total_weight", total_weight.to_string()),
    ]
}
