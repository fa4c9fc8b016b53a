//! Broker Adapters
//!
//! Implementations of `BrokerPort`: the Alpaca REST API and an in-process
//! simulated broker.

pub mod alpaca;
mod simulated;

pub use alpaca::{AlpacaBrokerAdapter, AlpacaConfig, AlpacaEnvironment, AlpacaError};
pub use simulated::SimulatedBroker;
