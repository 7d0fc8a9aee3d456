//! Explicit transition tables for workflow statuses

use thiserror::Error;

/// A workflow action was attempted from a state that does not permit it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

/// A status enum with a closed successor table.
///
/// `transition` is strict: moving to the current state is rejected unless
/// the table lists it. Idempotent "complete" operations check for the
/// settled state before calling it.
pub trait Lifecycle: Copy + Eq + 'static {
    const ENTITY: &'static str;

    fn successors(&self) -> &'static [Self];

    fn label(&self) -> &'static str;

    fn can_become(&self, next: Self) -> bool {
        self.successors().contains(&next)
    }

    fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }

    fn transition(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_become(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                entity: Self::ENTITY,
                from: self.label(),
                to: next.label(),
            })
        }
    }

    /// Rejects unless the current state is one of `allowed`; used by
    /// operations whose precondition is wider than a single edge.
    fn require_one_of(self, allowed: &[Self], action: Self) -> Result<Self, TransitionError> {
        if allowed.contains(&self) {
            Ok(self)
        } else {
            Err(TransitionError {
                entity: Self::ENTITY,
                from: self.label(),
                to: action.label(),
            })
        }
    }
}
