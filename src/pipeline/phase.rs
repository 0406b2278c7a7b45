use serde::Serialize;
use thiserror::Error;

/// Lifecycle of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Validating,
    Extracting,
    /// Summary, referral and trial matching in flight.
    Dispatched,
    Aggregating,
    Done,
    Failed,
}

impl RunPhase {
    /// Legal forward transitions. `Failed` is reachable only from the fatal
    /// stages; `Done` and `Failed` are terminal.
    pub fn can_transition_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Validating, Extracting)
                | (Validating, Failed)
                | (Extracting, Dispatched)
                | (Extracting, Failed)
                | (Dispatched, Aggregating)
                | (Aggregating, Done)
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Illegal pipeline transition {from:?} -> {to:?}")]
pub struct PhaseError {
    pub from: RunPhase,
    pub to: RunPhase,
}

/// Current phase of a run, advanced only along legal transitions.
#[derive(Debug)]
pub struct PhaseTracker {
    phase: RunPhase,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Validating,
        }
    }

    pub fn advance(&mut self, next: RunPhase) -> Result<(), PhaseError> {
        if !self.phase.can_transition_to(next) {
            return Err(PhaseError {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!(from = ?self.phase, to = ?next, "Pipeline phase");
        self.phase = next;
        Ok(())
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
