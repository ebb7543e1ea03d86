use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;

use crate::engine::SessionError;

/// Lifecycle of a transcription session. Transitions are strictly forward
/// apart from the explicit `Stopped -> Uninitialized` reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Reserving,
    Ready,
    Streaming,
    Finalizing,
    Stopped,
}

/// Validated state holder with a subscription channel, shared between the
/// session and its drain task.
pub struct SessionStateCell {
    state: RwLock<SessionState>,
    state_tx: Sender<SessionState>,
    state_rx: Receiver<SessionState>,
}

impl Default for SessionStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateCell {
    pub fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: RwLock::new(SessionState::Uninitialized),
            state_tx,
            state_rx,
        }
    }

    pub fn transition(&self, new_state: SessionState) -> Result<(), SessionError> {
        let mut current = self.state.write();

        let valid = matches!(
            (*current, new_state),
            (SessionState::Uninitialized, SessionState::Reserving)
                | (SessionState::Reserving, SessionState::Ready)
                | (SessionState::Reserving, SessionState::Uninitialized)
                | (SessionState::Ready, SessionState::Streaming)
                | (SessionState::Streaming, SessionState::Finalizing)
                | (SessionState::Streaming, SessionState::Stopped)
                | (SessionState::Finalizing, SessionState::Stopped)
                | (SessionState::Stopped, SessionState::Uninitialized)
        );

        if !valid {
            return Err(SessionError::InvalidTransition {
                from: *current,
                to: new_state,
            });
        }

        tracing::info!(target: "stt", "Session state: {:?} -> {:?}", *current, new_state);
        *current = new_state;
        let _ = self.state_tx.send(new_state);
        Ok(())
    }

    pub fn current(&self) -> SessionState {
        *self.state.read()
    }

    pub fn subscribe(&self) -> Receiver<SessionState> {
        self.state_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_forward_walk_is_valid() {
        let cell = SessionStateCell::new();
        for next in [
            SessionState::Reserving,
            SessionState::Ready,
            SessionState::Streaming,
            SessionState::Finalizing,
            SessionState::Stopped,
            SessionState::Uninitialized,
        ] {
            cell.transition(next).unwrap();
            assert_eq!(cell.current(), next);
        }
    }

    #[test]
    fn reservation_failure_returns_to_uninitialized() {
        let cell = SessionStateCell::new();
        cell.transition(SessionState::Reserving).unwrap();
        cell.transition(SessionState::Uninitialized).unwrap();
    }

    #[test]
    fn fatal_error_jumps_streaming_to_stopped() {
        let cell = SessionStateCell::new();
        cell.transition(SessionState::Reserving).unwrap();
        cell.transition(SessionState::Ready).unwrap();
        cell.transition(SessionState::Streaming).unwrap();
        cell.transition(SessionState::Stopped).unwrap();
    }

    #[test]
    fn backward_transitions_rejected() {
        let cell = SessionStateCell::new();
        assert!(matches!(
            cell.transition(SessionState::Streaming),
            Err(SessionError::InvalidTransition { .. })
        ));
        cell.transition(SessionState::Reserving).unwrap();
        assert!(cell.transition(SessionState::Stopped).is_err());
    }

    #[test]
    fn subscribers_observe_transitions() {
        let cell = SessionStateCell::new();
        let rx = cell.subscribe();
        cell.transition(SessionState::Reserving).unwrap();
        assert_eq!(rx.try_recv().unwrap(), SessionState::Reserving);
    }
}
