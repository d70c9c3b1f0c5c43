use std::time::{Duration, Instant};
use tracing::debug;

/// Stages of one `register` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Init,
    Navigated,
    FormFilled,
    Submitted,
    Succeeded,
    Failed,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptState::Succeeded | AttemptState::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: AttemptState,
    pub to: AttemptState,
    pub after: Duration,
    pub details: Option<String>,
}

/// Trace of a registration attempt through its state machine.
#[derive(Debug)]
pub struct Attempt {
    state: AttemptState,
    transitions: Vec<StateTransition>,
    started_at: Instant,
}

impl Default for Attempt {
    fn default() -> Self {
        Self::new()
    }
}

impl Attempt {
    pub fn new() -> Self {
        Self {
            state: AttemptState::Init,
            transitions: Vec::new(),
            started_at: Instant::now(),
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Move to `to`. Terminal states are final, later transitions are ignored.
    pub fn transition(&mut self, to: AttemptState, details: Option<String>) {
        if self.state.is_terminal() {
            return;
        }
        debug!(from = ?self.state, to = ?to, details = details.as_deref(), "attempt transition");
        self.transitions.push(StateTransition {
            from: self.state,
            to,
            after: self.started_at.elapsed(),
            details,
        });
        self.state = to;
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// `Init -> Navigated -> ...` for logging.
    pub fn path(&self) -> String {
        let mut path = format!("{:?}", AttemptState::Init);
        for t in &self.transitions {
            path.push_str(&format!(" -> {:?}", t.to));
        }
        path
    }
}
