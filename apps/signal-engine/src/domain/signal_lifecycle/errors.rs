//! Signal lifecycle errors.

use thiserror::Error;

use super::value_objects::SignalStatus;
use crate::domain::shared::SignalId;

/// Errors raised by the signal lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// The requested status is not adjacent to the current one.
    ///
    /// Covers phantom jumps such as `WAITING → TP3_HIT`.
    #[error("Illegal signal transition for {signal_id}: {from} -> {to}")]
    IllegalTransition {
        /// Signal the transition was requested for.
        signal_id: SignalId,
        /// Current status.
        from: SignalStatus,
        /// Requested status.
        to: SignalStatus,
    },

    /// The requested status lies on an earlier tier than the current one.
    #[error("Signal {signal_id} cannot regress from {from} to {to}")]
    StateRegression {
        /// Signal the transition was requested for.
        signal_id: SignalId,
        /// Current status.
        from: SignalStatus,
        /// Requested status.
        to: SignalStatus,
    },

    /// A signal supplied by the strategy layer is incomplete or inconsistent.
    #[error("Invalid signal field '{field}': {message}")]
    InvalidSignal {
        /// Offending field.
        field: String,
        /// Error message.
        message: String,
    },
}

/// Errors from the operational store.
///
/// Any of these means the whole batch was rejected and nothing was applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// The stored version differs from the one the write was based on.
    #[error("Version conflict on signal {signal_id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Signal being written.
        signal_id: SignalId,
        /// Version the caller read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// A write referenced a record that does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A write would create a duplicate record.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// The batch could not be committed.
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    /// Underlying storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PersistenceError {
    /// Short label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::VersionConflict { .. } => "version_conflict",
            Self::NotFound(_) => "not_found",
            Self::Duplicate(_) => "duplicate",
            Self::CommitFailed(_) => "commit_failed",
            Self::Storage(_) => "storage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_transition_display() {
        let err = SignalError::IllegalTransition {
            signal_id: SignalId::new("sig-1"),
            from: SignalStatus::Waiting,
            to: SignalStatus::Tp3Hit,
        };
        let msg = err.to_string();
        assert!(msg.contains("WAITING"));
        assert!(msg.contains("TP3_HIT"));
        assert!(msg.contains("sig-1"));
    }

    #[test]
    fn version_conflict_display() {
        let err = PersistenceError::VersionConflict {
            signal_id: SignalId::new("sig-2"),
            expected: 3,
            actual: 4,
        };
        assert!(err.to_string().contains("expected 3, found 4"));
    }
}
