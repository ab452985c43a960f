//! Per-connection state machine (§4.9): `Dialing → Handshaking → Connected →
//! (Banned | Disconnected)`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Dialing,
    Handshaking,
    Connected,
    Banned,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot transition from {from:?} to {to:?}")]
pub struct IllegalTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

impl ConnectionState {
    /// Validate and perform a transition, per the state machine's edges.
    /// `Connected` and `Handshaking` can both fall through to `Banned` or
    /// `Disconnected` at any time — a ban or a dropped socket doesn't wait
    /// for a tidy state.
    pub fn transition(self, to: ConnectionState) -> Result<ConnectionState, IllegalTransition> {
        use ConnectionState::*;
        let allowed = matches!(
            (self, to),
            (Dialing, Handshaking)
                | (Handshaking, Connected)
                | (Handshaking, Banned)
                | (Handshaking, Disconnected)
                | (Connected, Banned)
                | (Connected, Disconnected)
        );
        if allowed {
            Ok(to)
        } else {
            Err(IllegalTransition { from: self, to })
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Banned | ConnectionState::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn happy_path_follows_the_wire() {
        let state = Dialing;
        let state = state.transition(Handshaking).unwrap();
        let state = state.transition(Connected).unwrap();
        assert_eq!(state, Connected);
    }

    #[test]
    fn connected_can_be_banned_or_disconnected() {
        assert_eq!(Connected.transition(Banned).unwrap(), Banned);
        assert_eq!(Connected.transition(Disconnected).unwrap(), Disconnected);
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        assert!(Banned.transition(Connected).is_err());
        assert!(Disconnected.transition(Handshaking).is_err());
    }

    #[test]
    fn dialing_cannot_skip_handshaking() {
        assert!(Dialing.transition(Connected).is_err());
    }

    #[test]
    fn terminal_check() {
        assert!(Banned.is_terminal());
        assert!(Disconnected.is_terminal());
        assert!(!Connected.is_terminal());
    }
}
