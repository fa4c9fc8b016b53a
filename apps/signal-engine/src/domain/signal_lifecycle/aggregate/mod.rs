//! Signal Lifecycle Aggregates

mod position;
mod signal;

pub use position::Position;
pub(crate) use signal::ReconstitutedSignalParams;
pub use signal::{CreateSignalCommand, Signal};

#[cfg(test)]
pub(crate) use signal::test_support;
