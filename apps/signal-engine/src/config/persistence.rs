//! Operational store configuration.

use serde::{Deserialize, Serialize};

/// Store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    /// Process memory; lost on exit.
    Memory,
    /// SQLite file.
    #[default]
    Sqlite,
}

/// Operational store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Backend.
    pub backend: PersistenceBackend,
    /// Database path for the SQLite backend.
    pub db_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::default(),
            db_path: "./data/signals.db".to_string(),
        }
    }
}

impl PersistenceConfig {
    /// Connection URL for the SQLite backend.
    #[must_use]
    pub fn sqlite_url(&self) -> String {
        format!("sqlite://{}", self.db_path)
    }
}
