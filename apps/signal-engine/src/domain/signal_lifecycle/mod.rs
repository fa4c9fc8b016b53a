//! Signal Lifecycle Bounded Context
//!
//! Signals, their positions, and the state machine that is the only way a
//! signal's status changes.
//!
//! # State Machine
//!
//! ```text
//! WAITING → ACTIVE → TP1_HIT → TP2_HIT → TP3_HIT
//!    │         │         │         │
//!    │         └─────────┴─────────┴──→ STOP_LOSS_HIT | CLOSED_MANUAL
//!    └──→ EXPIRED | STOP_LOSS_HIT | CLOSED_MANUAL
//! ```

pub mod aggregate;
pub mod errors;
pub mod repository;
pub mod services;
pub mod value_objects;

pub(crate) use aggregate::ReconstitutedSignalParams;
pub use aggregate::{CreateSignalCommand, Position, Signal};
pub use errors::{PersistenceError, SignalError};
pub use repository::{CommitReceipt, SignalRepository, SignalStore, UnitOfWork, WriteOp};
pub use services::{SignalStateMachine, TransitionOutcome, TransitionTable};
pub use value_objects::{AssetClass, Direction, PriceLevels, SignalStatus, UnknownStatus};
