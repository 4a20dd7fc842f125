//! Per-session skip policy and the active-session registry.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::{CancelToken, Coordinate};

pub type SessionId = SmolStr;

/// Which breakpoints a session passes through silently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SkipPolicy {
    /// Every breakpoint fires.
    #[default]
    None,
    /// No breakpoint fires until the next top-level evaluation.
    All,
    /// Breakpoints strictly below the coordinate are skipped.
    Below(Coordinate),
}

impl SkipPolicy {
    #[must_use]
    pub fn skips(&self, coordinate: &Coordinate) -> bool {
        match self {
            SkipPolicy::None => false,
            SkipPolicy::All => true,
            SkipPolicy::Below(ancestor) => ancestor.is_strict_prefix_of(coordinate),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    policy: SkipPolicy,
    running: Vec<CancelToken>,
}

/// Thread-safe registry of sessions keyed by id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<FxHashMap<SessionId, SessionState>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unknown sessions report [`SkipPolicy::None`].
    #[must_use]
    pub fn get_skip_policy(&self, session: &str) -> SkipPolicy {
        self.sessions
            .lock()
            .get(session)
            .map(|state| state.policy.clone())
            .unwrap_or_default()
    }

    pub fn set_skip_policy(&self, session: &str, policy: SkipPolicy) {
        let mut sessions = self.sessions.lock();
        sessions.entry(SmolStr::new(session)).or_default().policy = policy;
    }

    #[must_use]
    pub fn should_skip(&self, session: &str, coordinate: &Coordinate) -> bool {
        self.sessions
            .lock()
            .get(session)
            .is_some_and(|state| state.policy.skips(coordinate))
    }

    /// Starts a top-level evaluation: creates the session if needed, resets
    /// its policy and registers the evaluation's token.
    pub fn begin_evaluation(&self, session: &str, cancel: &CancelToken) {
        let mut sessions = self.sessions.lock();
        let state = sessions.entry(SmolStr::new(session)).or_default();
        state.policy = SkipPolicy::None;
        state.running.push(cancel.clone());
    }

    /// Drops a [`SkipPolicy::Below`]; [`SkipPolicy::All`] lasts for the whole
    /// evaluation.
    pub fn clear_nested_skip(&self, session: &str) {
        if let Some(state) = self.sessions.lock().get_mut(session) {
            if matches!(state.policy, SkipPolicy::Below(_)) {
                state.policy = SkipPolicy::None;
            }
        }
    }

    pub fn finish_evaluation(&self, session: &str, cancel: &CancelToken) {
        let mut sessions = self.sessions.lock();
        if let Some(state) = sessions.get_mut(session) {
            state.running.retain(|token| !token.same_as(cancel));
        }
    }

    /// Forgets the session and returns the tokens of its running evaluations.
    pub fn close(&self, session: &str) -> Option<Vec<CancelToken>> {
        self.sessions
            .lock()
            .remove(session)
            .map(|state| state.running)
    }

    /// Sorted ids of known sessions.
    #[must_use]
    pub fn sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}
