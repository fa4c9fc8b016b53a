//! Signal State Machine Service
//!
//! The single place where a signal's status is changed.

use chrono::{DateTime, Utc};

use super::transition_table::TransitionTable;
use crate::domain::signal_lifecycle::aggregate::Signal;
use crate::domain::signal_lifecycle::errors::SignalError;
use crate::domain::signal_lifecycle::value_objects::SignalStatus;

/// Result of applying a requested status to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Status changed.
    Applied {
        /// Status before the change.
        from: SignalStatus,
        /// Status after the change.
        to: SignalStatus,
    },
    /// Signal was already terminal; nothing changed.
    Ignored {
        /// Terminal status the signal is in.
        status: SignalStatus,
    },
    /// Signal was already in the requested status; nothing changed.
    Unchanged {
        /// Status the signal is in.
        status: SignalStatus,
    },
}

impl TransitionOutcome {
    /// Returns true if the signal was mutated.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Signal State Machine.
pub struct SignalStateMachine;

impl SignalStateMachine {
    /// Apply a requested status to a signal.
    ///
    /// A terminal signal is returned unchanged with [`TransitionOutcome::Ignored`].
    /// Requesting the status a live signal already has is a repeat, returned
    /// unchanged with [`TransitionOutcome::Unchanged`].
    ///
    /// # Errors
    ///
    /// Returns `StateRegression` if the target tier lies before the current one,
    /// or `IllegalTransition` for any other move the table does not permit.
    pub fn apply(
        mut signal: Signal,
        requested: SignalStatus,
        at: DateTime<Utc>,
    ) -> Result<(Signal, TransitionOutcome), SignalError> {
        let from = signal.status();

        if from.is_terminal() {
            tracing::debug!(
                signal_id = %signal.id(),
                status = %from,
                requested = %requested,
                "Transition ignored for terminal signal"
            );
            return Ok((signal, TransitionOutcome::Ignored { status: from }));
        }

        if from == requested {
            return Ok((signal, TransitionOutcome::Unchanged { status: from }));
        }

        Self::validate(&signal, requested)?;

        signal.set_status(requested, at);
        Ok((signal, TransitionOutcome::Applied { from, to: requested }))
    }

    /// Check a transition without applying it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::apply`], except terminal signals and repeats of the
    /// current status are rejected too.
    pub fn validate(signal: &Signal, requested: SignalStatus) -> Result<(), SignalError> {
        let from = signal.status();
        if TransitionTable::permits(from, requested) {
            return Ok(());
        }

        let regression = matches!(
            (from.tier(), requested.tier()),
            (Some(current), Some(target)) if target < current
        );

        if regression {
            Err(SignalError::StateRegression {
                signal_id: signal.id().clone(),
                from,
                to: requested,
            })
        } else {
            Err(SignalError::IllegalTransition {
                signal_id: signal.id().clone(),
                from,
                to: requested,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal_lifecycle::aggregate::test_support::{signal_in, waiting_signal};
    use proptest::prelude::*;

    #[test]
    fn waiting_to_active_applies() {
        let signal = waiting_signal("sig-1", "AAPL");
        let (signal, outcome) =
            SignalStateMachine::apply(signal, SignalStatus::Active, Utc::now()).unwrap();
        assert_eq!(signal.status(), SignalStatus::Active);
        assert_eq!(
            outcome,
            TransitionOutcome::Applied {
                from: SignalStatus::Waiting,
                to: SignalStatus::Active
            }
        );
    }

    #[test]
    fn phantom_jump_is_illegal() {
        let signal = waiting_signal("sig-1", "AAPL");
        let err = SignalStateMachine::apply(signal, SignalStatus::Tp3Hit, Utc::now()).unwrap_err();
        assert!(matches!(err, SignalError::IllegalTransition { .. }));
    }

    #[test]
    fn tier_regression_is_rejected() {
        let signal = signal_in("sig-1", "AAPL", SignalStatus::Tp2Hit);
        let err = SignalStateMachine::apply(signal, SignalStatus::Tp1Hit, Utc::now()).unwrap_err();
        assert!(matches!(err, SignalError::StateRegression { .. }));
    }

    #[test]
    fn back_to_active_is_regression() {
        let signal = signal_in("sig-1", "AAPL", SignalStatus::Tp2Hit);
        let err = SignalStateMachine::apply(signal, SignalStatus::Active, Utc::now()).unwrap_err();
        assert!(matches!(err, SignalError::StateRegression { .. }));
    }

    #[test]
    fn expiry_after_fill_is_illegal() {
        let signal = signal_in("sig-1", "AAPL", SignalStatus::Active);
        let err = SignalStateMachine::apply(signal, SignalStatus::Expired, Utc::now()).unwrap_err();
        assert!(matches!(err, SignalError::IllegalTransition { .. }));
    }

    #[test]
    fn repeated_status_is_unchanged() {
        let signal = signal_in("sig-1", "AAPL", SignalStatus::Tp1Hit);
        let version = signal.version();
        let (signal, outcome) =
            SignalStateMachine::apply(signal, SignalStatus::Tp1Hit, Utc::now()).unwrap();
        assert_eq!(signal.status(), SignalStatus::Tp1Hit);
        assert_eq!(signal.version(), version);
        assert_eq!(
            outcome,
            TransitionOutcome::Unchanged {
                status: SignalStatus::Tp1Hit
            }
        );
        assert!(!outcome.is_applied());
    }

    #[test]
    fn terminal_signal_is_ignored_repeatedly() {
        let signal = signal_in("sig-1", "AAPL", SignalStatus::StopLossHit);
        let (signal, first) =
            SignalStateMachine::apply(signal, SignalStatus::ClosedManual, Utc::now()).unwrap();
        let (signal, second) =
            SignalStateMachine::apply(signal, SignalStatus::ClosedManual, Utc::now()).unwrap();
        assert_eq!(signal.status(), SignalStatus::StopLossHit);
        assert_eq!(first, second);
        assert!(!first.is_applied());
    }

    fn status_strategy() -> impl Strategy<Value = SignalStatus> {
        prop::sample::select(SignalStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn tier_never_decreases(requests in prop::collection::vec(status_strategy(), 0..24)) {
            let mut signal = waiting_signal("sig-prop", "AAPL");
            let mut last_tier = signal.status().tier();

            for requested in requests {
                if let Ok((next, outcome)) =
                    SignalStateMachine::apply(signal.clone(), requested, Utc::now())
                {
                    if let (Some(before), Some(after)) = (last_tier, next.status().tier()) {
                        prop_assert!(after >= before);
                    }
                    if outcome.is_applied() {
                        prop_assert!(TransitionTable::permits(signal.status(), next.status()));
                    }
                    if next.status().tier().is_some() {
                        last_tier = next.status().tier();
                    }
                    signal = next;
                }
            }
        }

        #[test]
        fn terminal_status_never_changes(
            terminal in prop::sample::select(SignalStatus::TERMINAL.to_vec()),
            requests in prop::collection::vec(status_strategy(), 1..16),
        ) {
            let mut signal = signal_in("sig-prop", "AAPL", terminal);
            for requested in requests {
                let (next, outcome) =
                    SignalStateMachine::apply(signal, requested, Utc::now()).unwrap();
                prop_assert_eq!(next.status(), terminal);
                prop_assert_eq!(outcome, TransitionOutcome::Ignored { status: terminal });
                signal = next;
            }
        }
    }
}
