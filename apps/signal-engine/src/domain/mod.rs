//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: Consistency boundaries with invariants
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Services**: Stateless business logic
//! - **Repository Traits**: Persistence abstractions (implemented in adapters)
//!
//! # Bounded Contexts
//!
//! - [`signal_lifecycle`]: Signals, positions and the lifecycle state machine
//! - [`reconciliation`]: Store/broker mismatch classification and audit records

pub mod reconciliation;
pub mod shared;
pub mod signal_lifecycle;
