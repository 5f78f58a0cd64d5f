use std::collections::VecDeque;

use super::error::{StateError, StateResult};
use super::{SessionEvent, SessionState, StateTransition};

const TRANSITION_LOG_CAPACITY: usize = 32;

#[derive(Debug)]
pub struct StateMachine {
    state: SessionState,
    transition_log: VecDeque<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::default(),
            transition_log: VecDeque::with_capacity(TRANSITION_LOG_CAPACITY),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn can_transition(&self, event: SessionEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: SessionEvent) -> Option<SessionState> {
        use SessionEvent::*;
        use SessionState::*;
        match (self.state, event) {
            (_, Clear) => Some(Empty),
            (Empty | Loaded | Failed, Load) => Some(Loaded),
            (Empty | Loaded | Failed, Submit) => Some(Busy),
            (Busy, Succeed) => Some(Loaded),
            (Empty | Loaded | Busy, Fail) => Some(Failed),
            (Failed, Acknowledge) => Some(Loaded),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: SessionEvent) -> StateResult<SessionState> {
        tracing::debug!(from = ?self.state, event = ?event, "request state transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid state transition requested");
            StateError::InvalidStateTransition { from, event }
        })?;

        if self.transition_log.len() == TRANSITION_LOG_CAPACITY {
            self.transition_log.pop_front();
        }
        self.transition_log
            .push_back(StateTransition::new(self.state, event, next));
        self.state = next;

        Ok(self.state)
    }

    /// Most recent transitions, oldest first.
    pub fn recent_transitions(&self) -> impl Iterator<Item = &StateTransition> {
        self.transition_log.iter()
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionState::{:?}", self.state)
    }
}
