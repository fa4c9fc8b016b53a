//! Transition Table
//!
//! Legal signal transitions as explicit adjacency. Tier order is never derived
//! from the enum discriminant.

use crate::domain::signal_lifecycle::value_objects::SignalStatus;

/// Explicit adjacency of the signal lifecycle.
pub struct TransitionTable;

impl TransitionTable {
    /// Check if `from → to` is a permitted transition.
    #[must_use]
    pub const fn permits(from: SignalStatus, to: SignalStatus) -> bool {
        use SignalStatus::{
            Active, ClosedManual, Expired, StopLossHit, Tp1Hit, Tp2Hit, Tp3Hit, Waiting,
        };

        matches!(
            (from, to),
            // From Waiting
            (Waiting, Active)
                | (Waiting, Expired)
                | (Waiting, StopLossHit)
                | (Waiting, ClosedManual)
                // From Active
                | (Active, Tp1Hit)
                | (Active, Tp2Hit)
                | (Active, Tp3Hit)
                | (Active, StopLossHit)
                | (Active, ClosedManual)
                // From Tp1Hit
                | (Tp1Hit, Tp2Hit)
                | (Tp1Hit, Tp3Hit)
                | (Tp1Hit, StopLossHit)
                | (Tp1Hit, ClosedManual)
                // From Tp2Hit
                | (Tp2Hit, Tp3Hit)
                | (Tp2Hit, StopLossHit)
                | (Tp2Hit, ClosedManual)
        )
    }

    /// All statuses reachable in one step from `from`.
    #[must_use]
    pub fn next_states(from: SignalStatus) -> Vec<SignalStatus> {
        SignalStatus::ALL
            .into_iter()
            .filter(|to| Self::permits(from, *to))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(SignalStatus::Waiting, SignalStatus::Active ; "entry fill")]
    #[test_case(SignalStatus::Waiting, SignalStatus::Expired ; "deadline passed")]
    #[test_case(SignalStatus::Active, SignalStatus::Tp1Hit ; "first target")]
    #[test_case(SignalStatus::Active, SignalStatus::Tp2Hit ; "gap through first target")]
    #[test_case(SignalStatus::Tp1Hit, SignalStatus::Tp3Hit ; "gap through second target")]
    #[test_case(SignalStatus::Tp2Hit, SignalStatus::Tp3Hit ; "final target")]
    #[test_case(SignalStatus::Tp2Hit, SignalStatus::StopLossHit ; "stopped after tp2")]
    #[test_case(SignalStatus::Waiting, SignalStatus::ClosedManual ; "manual close before fill")]
    fn permitted(from: SignalStatus, to: SignalStatus) {
        assert!(TransitionTable::permits(from, to));
    }

    #[test_case(SignalStatus::Waiting, SignalStatus::Tp3Hit ; "phantom jump")]
    #[test_case(SignalStatus::Waiting, SignalStatus::Tp1Hit ; "skips active")]
    #[test_case(SignalStatus::Active, SignalStatus::Expired ; "expiry after fill")]
    #[test_case(SignalStatus::Tp2Hit, SignalStatus::Tp1Hit ; "tier regression")]
    #[test_case(SignalStatus::Tp1Hit, SignalStatus::Active ; "back to active")]
    #[test_case(SignalStatus::Active, SignalStatus::Active ; "self loop")]
    #[test_case(SignalStatus::Tp3Hit, SignalStatus::ClosedManual ; "out of terminal")]
    fn forbidden(from: SignalStatus, to: SignalStatus) {
        assert!(!TransitionTable::permits(from, to));
    }

    #[test]
    fn terminal_states_have_no_successors() {
        for status in SignalStatus::TERMINAL {
            assert!(TransitionTable::next_states(status).is_empty());
        }
    }

    #[test]
    fn side_exits_reachable_from_every_non_terminal() {
        for status in SignalStatus::NON_TERMINAL {
            let next = TransitionTable::next_states(status);
            assert!(next.contains(&SignalStatus::StopLossHit));
            assert!(next.contains(&SignalStatus::ClosedManual));
        }
    }
}
