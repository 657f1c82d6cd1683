use serde::Serialize;
use tracing::{debug, warn};

/// Stages of one summarization run. Nothing is persisted between stages; an
/// interrupted run starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    SizeCheck,
    SingleShot,
    Chunked,
    Cleanup,
    Done,
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (NotStarted, SizeCheck)
                | (SizeCheck, SingleShot)
                | (SizeCheck, Chunked)
                | (SizeCheck, Done)
                | (SingleShot, Cleanup)
                | (Chunked, Cleanup)
                | (Cleanup, Done)
        )
    }
}

/// How a report was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryPath {
    /// Nothing to summarize.
    Empty,
    /// Summarization disabled by configuration.
    Skipped,
    SingleShot,
    Chunked,
}

/// Tracks and logs the state of one run.
#[derive(Debug)]
pub(crate) struct RunTracker {
    state: RunState,
    history: Vec<RunState>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self { state: RunState::NotStarted, history: vec![RunState::NotStarted] }
    }

    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn advance(&mut self, next: RunState) {
        if !self.state.can_transition_to(next) {
            warn!(from = ?self.state, to = ?next, "unexpected run state transition");
        }
        debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
        self.history.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions() {
        assert!(RunState::NotStarted.can_transition_to(RunState::SizeCheck));
        assert!(RunState::SizeCheck.can_transition_to(RunState::Chunked));
        assert!(RunState::Chunked.can_transition_to(RunState::Cleanup));
        assert!(!RunState::NotStarted.can_transition_to(RunState::Done));
        assert!(!RunState::SingleShot.can_transition_to(RunState::Chunked));
    }

    #[test]
    fn tracker_records_history() {
        let mut t = RunTracker::new();
        for s in [RunState::SizeCheck, RunState::SingleShot, RunState::Cleanup, RunState::Done] {
            t.advance(s);
        }
        assert_eq!(t.state, RunState::Done);
        assert_eq!(t.history().len(), 5);
    }
}
