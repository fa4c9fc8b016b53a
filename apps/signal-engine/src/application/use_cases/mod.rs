//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.
//! Every use case that changes state commits through the persistence
//! coordinator and only then hands a notification to the gate.

mod archive_signals;
mod error;
mod expire_stale_signals;
mod open_position;
mod reconcile;
mod register_signal;
mod submit_signal_order;
mod transition_signal;

pub use archive_signals::{ArchiveReport, ArchiveSignalsUseCase};
pub use error::UseCaseError;
pub use expire_stale_signals::{ExpireStaleSignalsUseCase, ExpiryReport};
pub use open_position::{EntryFill, OpenPositionUseCase};
pub use reconcile::{CheckFailure, CycleReport, ReconcileConfig, ReconcileUseCase};
pub use register_signal::RegisterSignalUseCase;
pub use submit_signal_order::{SubmitReport, SubmitSignalOrderUseCase};
pub use transition_signal::{TransitionReport, TransitionSignalUseCase};
