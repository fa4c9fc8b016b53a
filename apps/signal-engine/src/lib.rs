// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Signal Engine - Rust Core Library
//!
//! Keeps a trading bot's record of intent (signals) consistent with the
//! broker's record of holdings.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic
//!   - `signal_lifecycle`: Signal aggregate, status adjacency table, state machine,
//!     operational store traits
//!   - `reconciliation`: Mismatch classification and reconciliation records
//!   - `shared`: Identifiers and symbols
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`BrokerPort`, `NotificationSink`,
//!     `ColdStorePort`)
//!   - `services`: Broker gateway, persistence coordinator, notification gate,
//!     cycle scheduler
//!   - `use_cases`: `RegisterSignal`, `TransitionSignal`, `SubmitSignalOrder`,
//!     `OpenPosition`, `Reconcile`, `ExpireStaleSignals`, `ArchiveSignals`
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `broker`: Alpaca REST adapter and simulated broker
//!   - `persistence`: In-memory and SQLite operational stores
//!   - `notification`: Webhook and log sinks
//!   - `archive`: JSON-lines cold store
//!   - `config`: Dependency injection container

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// YAML configuration loading and validation.
pub mod config;

/// Logging and metrics setup.
pub mod telemetry;

// =============================================================================
// Re-exports from Clean Architecture
// =============================================================================

// Domain re-exports
pub use domain::reconciliation::{CorrectiveAction, MismatchKind, ReconciliationRecord};
pub use domain::shared::{BrokerOrderId, ClientOrderId, SignalId, StrategyId, Symbol};
pub use domain::signal_lifecycle::{
    AssetClass, CreateSignalCommand, PersistenceError, Position, PriceLevels, Signal,
    SignalError, SignalStateMachine, SignalStatus, SignalStore, WriteOp,
};

// Application re-exports
pub use application::ports::{
    BrokerError, BrokerPort, ColdStorePort, Notification, NotificationSink,
};
pub use application::services::{
    BrokerGateway, CycleScheduler, NotificationGate, PersistenceCoordinator,
};
pub use application::use_cases::{
    ArchiveSignalsUseCase, CycleReport, EntryFill, ExpireStaleSignalsUseCase,
    OpenPositionUseCase, ReconcileUseCase, RegisterSignalUseCase, SubmitSignalOrderUseCase,
    TransitionSignalUseCase, UseCaseError,
};

// Infrastructure re-exports
pub use infrastructure::broker::{AlpacaBrokerAdapter, SimulatedBroker};
pub use infrastructure::config::Container;
pub use infrastructure::persistence::{InMemorySignalStore, SqliteSignalStore};
