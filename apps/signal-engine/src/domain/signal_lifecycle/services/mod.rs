//! Signal Lifecycle Domain Services

mod signal_state_machine;
mod transition_table;

pub use signal_state_machine::{SignalStateMachine, TransitionOutcome};
pub use transition_table::TransitionTable;
