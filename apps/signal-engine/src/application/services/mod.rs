//! Application Services
//!
//! Application services coordinate domain logic and infrastructure adapters.
//! They differ from use cases in that they guard a boundary (broker, store,
//! notification sink) or run as background tasks.

mod backoff;
mod broker_gateway;
mod notification_gate;
mod persistence_coordinator;
mod scheduler;

pub use backoff::{ExponentialBackoff, RetryPolicy, duration_ms};
pub use broker_gateway::{
    BatchFailure, BrokerGateway, GatewayConfig, GatewayError, HoldingsReport, OrderIntent,
    OrderLookup, OrderPurpose, Placement,
};
pub use notification_gate::{GateOutcome, NotificationGate, NotificationPolicy};
pub use persistence_coordinator::{PersistenceCoordinator, SignalGuard};
pub use scheduler::{CycleScheduler, SchedulerConfig, TickSummary};
