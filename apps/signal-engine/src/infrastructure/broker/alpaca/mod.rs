//! Alpaca Markets Broker Adapter
//!
//! Implementation of `BrokerPort` for the Alpaca Markets trading API with:
//! - Bulk position lookup filtered to the requested symbols
//! - Order lookup by broker ID and by client order ID
//! - Retry with exponential backoff for network and 5xx errors
//! - Rate limits surfaced with the server's backoff hint

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;

pub use adapter::AlpacaBrokerAdapter;
pub use config::{AlpacaConfig, AlpacaEnvironment};
pub use error::AlpacaError;
