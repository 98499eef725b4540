//! Batch phase state machine
//!
//! `Receiving -> Uploading -> Composing -> CleaningUp -> Done`, with `Failed`
//! reachable from every non-terminal phase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    /// Validating the submitted batch
    Receiving,
    /// Storing each raw image
    Uploading,
    /// Requesting the composite
    Composing,
    /// Deleting redundant intermediates
    CleaningUp,
    /// Composite returned
    Done,
    /// Batch aborted
    Failed,
}

impl BatchPhase {
    /// Whether no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchPhase::Done | BatchPhase::Failed)
    }
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchPhase::Receiving => "receiving",
            BatchPhase::Uploading => "uploading",
            BatchPhase::Composing => "composing",
            BatchPhase::CleaningUp => "cleaning up",
            BatchPhase::Done => "done",
            BatchPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Attempted move between phases that the lifecycle does not allow
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal phase transition: {from} -> {to}")]
pub struct IllegalTransition {
    /// Current phase
    pub from: BatchPhase,
    /// Requested phase
    pub to: BatchPhase,
}

/// Phases reachable from `from`
#[must_use]
pub fn allowed_transitions(from: BatchPhase) -> Vec<BatchPhase> {
    use BatchPhase::*;
    match from {
        Receiving => vec![Uploading, Failed],
        Uploading => vec![Composing, Failed],
        Composing => vec![CleaningUp, Failed],
        CleaningUp => vec![Done, Failed],
        Done | Failed => vec![],
    }
}

/// Validates a phase transition.
///
/// # Errors
/// Returns [`IllegalTransition`] if `to` is not reachable from `from`.
pub fn validate_transition(from: BatchPhase, to: BatchPhase) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}
