//! Application Ports (Driven)
//!
//! Ports define interfaces for the external systems the engine depends on.

mod broker_port;
mod cold_store_port;
mod notification_port;

pub use broker_port::{
    BrokerError, BrokerOrderStatus, BrokerPort, OrderSide, OrderSnapshot, OrderType,
    SubmitOrderRequest, TimeInForce,
};
#[cfg(test)]
pub use broker_port::MockBrokerPort;
pub use cold_store_port::{ArchiveEntry, ColdStoreError, ColdStorePort};
pub use notification_port::{Notification, NotificationError, NotificationSink};
