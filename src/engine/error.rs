//! Engine error types

use thiserror::Error;

/// A broken assumption about remote state after our own edits.
///
/// These are never retried or worked around: the remote and local views
/// have diverged, so the run halts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("expected {expected} steps after edits, found {observed}")]
    ChildCountMismatch { expected: usize, observed: usize },

    #[error("step '{name}' is missing after edits")]
    MissingChild { name: String },

    #[error("step '{name}' is at index {observed} but belongs at {expected}, and steps can only move up")]
    PriorityWouldDecrease {
        name: String,
        observed: usize,
        expected: usize,
    },

    #[error("sibling order did not converge within {cap} moves")]
    ConvergenceCapExceeded { cap: usize },
}

/// Errors that halt reconciliation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invariant violated in flow '{flow}': {violation}")]
    InvariantViolation { flow: String, violation: Violation },

    #[error(transparent)]
    Remote(#[from] realmkit::Error),
}

impl EngineError {
    pub fn violation(flow: &str, violation: Violation) -> Self {
        Self::InvariantViolation {
            flow: flow.to_string(),
            violation,
        }
    }

    /// Get actionable advice for this error.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::InvariantViolation { .. } => {
                "Another writer may have changed the flow; inspect it and re-run"
            }
            Self::Remote(err) => err.category().advice(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_message_names_flow() {
        let err = EngineError::violation(
            "login",
            Violation::ChildCountMismatch {
                expected: 3,
                observed: 2,
            },
        );
        assert_eq!(
            err.to_string(),
            "invariant violated in flow 'login': expected 3 steps after edits, found 2"
        );
    }

    #[test]
    fn test_remote_error_is_transparent() {
        let err: EngineError = realmkit::Error::not_found("flow", "x").into();
        assert_eq!(err.to_string(), "flow not found: x");
    }
}
