//! Cold Store Port (Driven Port)
//!
//! Long-term storage that terminal signals are exported to before they are
//! removed from the operational store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::reconciliation::ReconciliationRecord;
use crate::domain::signal_lifecycle::Signal;

/// One terminal signal and its audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// The terminal signal.
    pub signal: Signal,
    /// Reconciliation records linked to it.
    pub records: Vec<ReconciliationRecord>,
    /// Export time.
    pub archived_at: DateTime<Utc>,
}

/// Cold store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColdStoreError {
    /// Writing to the store failed.
    #[error("Cold store I/O error: {0}")]
    Io(String),

    /// An entry could not be encoded.
    #[error("Cold store serialization error: {0}")]
    Serialization(String),
}

/// Port for exporting archived signals.
#[async_trait]
pub trait ColdStorePort: Send + Sync {
    /// Durably export a batch of entries. On error none are considered exported.
    async fn export(&self, entries: &[ArchiveEntry]) -> Result<(), ColdStoreError>;
}
