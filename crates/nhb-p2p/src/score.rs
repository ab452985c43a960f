//! Peer misbehavior scoring and bans (§4.9).
//!
//! Unlike a gossip-mesh scorer that decays reputation over time, this is a
//! simple running tally: each misbehavior adds to a peer's score, and
//! crossing a threshold changes how the peer is treated. There is no decay —
//! a peer that crosses `ban_score` stays banned for `ban_duration` regardless
//! of subsequent good behavior.

use std::collections::HashMap;

use crate::handshake::NodeId;

/// Points added to a peer's score for a given misbehavior.
#[derive(Debug, Clone, Copy)]
pub enum Misbehavior {
    InvalidPayload,
    ReplayedNonce,
    RateLimitViolation,
}

impl Misbehavior {
    fn points(self) -> u32 {
        match self {
            Misbehavior::InvalidPayload => 10,
            Misbehavior::ReplayedNonce => 20,
            Misbehavior::RateLimitViolation => 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Score at or above which a peer is no longer advertised to others over PEX.
    pub grey_score: u32,
    /// Score at or above which a peer is banned.
    pub ban_score: u32,
    /// How long, in seconds, a ban lasts once imposed.
    pub ban_duration_secs: u64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            grey_score: 50,
            ban_score: 100,
            ban_duration_secs: 24 * 3600,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PeerScoreState {
    score: u32,
    banned_until_secs: Option<u64>,
}

/// Tracks every peer's running misbehavior score and any active bans.
#[derive(Debug)]
pub struct ScoreBook {
    peers: HashMap<NodeId, PeerScoreState>,
    config: ScoreConfig,
}

impl ScoreBook {
    pub fn new(config: ScoreConfig) -> Self {
        Self {
            peers: HashMap::new(),
            config,
        }
    }

    /// Record a misbehavior, imposing a ban if the peer just crossed
    /// `ban_score`. Returns the peer's score after the update.
    pub fn record(&mut self, peer: NodeId, misbehavior: Misbehavior, now_secs: u64) -> u32 {
        let state = self.peers.entry(peer).or_default();
        state.score = state.score.saturating_add(misbehavior.points());
        if state.score >= self.config.ban_score && state.banned_until_secs.is_none() {
            state.banned_until_secs = Some(now_secs + self.config.ban_duration_secs);
        }
        state.score
    }

    pub fn score(&self, peer: &NodeId) -> u32 {
        self.peers.get(peer).map(|s| s.score).unwrap_or(0)
    }

    /// Whether PEX and outbound advertisement should exclude this peer.
    pub fn is_grey(&self, peer: &NodeId) -> bool {
        self.score(peer) >= self.config.grey_score
    }

    /// Whether the peer is currently under an active ban.
    pub fn is_banned(&self, peer: &NodeId, now_secs: u64) -> bool {
        self.peers
            .get(peer)
            .and_then(|s| s.banned_until_secs)
            .is_some_and(|until| now_secs < until)
    }

    /// Lift expired bans so a peer that served its time can reconnect and
    /// start clean. Returns the peers whose bans expired.
    pub fn expire_bans(&mut self, now_secs: u64) -> Vec<NodeId> {
        let mut expired = Vec::new();
        for (peer, state) in self.peers.iter_mut() {
            if let Some(until) = state.banned_until_secs {
                if now_secs >= until {
                    state.banned_until_secs = None;
                    state.score = 0;
                    expired.push(*peer);
                }
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn testing_config() -> ScoreConfig {
        ScoreConfig {
            grey_score: 20,
            ban_score: 40,
            ban_duration_secs: 100,
        }
    }

    fn peer(byte: u8) -> NodeId {
        [byte; 32]
    }

    #[test]
    fn score_accumulates_across_misbehaviors() {
        let mut book = ScoreBook::new(testing_config());
        let p = peer(1);
        book.record(p, Misbehavior::InvalidPayload, 0);
        book.record(p, Misbehavior::RateLimitViolation, 0);
        assert_eq!(book.score(&p), 15);
    }

    #[test]
    fn crossing_grey_score_greylists_without_banning() {
        let mut book = ScoreBook::new(testing_config());
        let p = peer(1);
        book.record(p, Misbehavior::InvalidPayload, 0);
        book.record(p, Misbehavior::InvalidPayload, 0);
        assert!(book.is_grey(&p));
        assert!(!book.is_banned(&p, 0));
    }

    #[test]
    fn crossing_ban_score_bans_for_ban_duration() {
        let mut book = ScoreBook::new(testing_config());
        let p = peer(1);
        for _ in 0..4 {
            book.record(p, Misbehavior::InvalidPayload, 1_000);
        }
        assert!(book.is_banned(&p, 1_000));
        assert!(book.is_banned(&p, 1_050));
        assert!(!book.is_banned(&p, 1_100));
    }

    #[test]
    fn expire_bans_resets_score_and_reports_expiry() {
        let mut book = ScoreBook::new(testing_config());
        let p = peer(1);
        for _ in 0..4 {
            book.record(p, Misbehavior::InvalidPayload, 1_000);
        }
        assert!(book.expire_bans(1_050).is_empty());
        let expired = book.expire_bans(1_100);
        assert_eq!(expired, vec![p]);
        assert_eq!(book.score(&p), 0);
        assert!(!book.is_banned(&p, 1_100));
    }
}
