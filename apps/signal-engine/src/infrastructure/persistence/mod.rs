//! Persistence Adapters
//!
//! Implementations of the operational store.

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemorySignalStore;
pub use sqlite::SqliteSignalStore;
