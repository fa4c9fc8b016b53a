//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - `broker/`: Alpaca REST adapter and an in-process simulated broker
//! - `persistence/`: operational store (in-memory, SQLite)
//! - `notification/`: webhook and log sinks
//! - `archive/`: JSON-lines cold store
//! - `config/`: wiring of adapters into services and use cases

pub mod archive;
pub mod broker;
pub mod config;
pub mod notification;
pub mod persistence;
