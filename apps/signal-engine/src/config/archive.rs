//! Cold storage configuration.

use serde::{Deserialize, Serialize};

/// Archival of terminal signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Run archival on each tick.
    pub enabled: bool,
    /// JSON-lines archive file.
    pub path: String,
    /// Days an archived signal stays in the operational store.
    pub retention_days: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "./data/archive.jsonl".to_string(),
            retention_days: 7,
        }
    }
}

impl ArchiveConfig {
    /// Retention as a calendar duration.
    #[must_use]
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }
}
