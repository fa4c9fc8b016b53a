//! Archive Signals Use Case
//!
//! Terminal signals are exported to the cold store together with their
//! reconciliation records, marked archived, and removed from the operational
//! store once the retention window after export has passed.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::error::UseCaseError;
use crate::application::ports::{ArchiveEntry, ColdStorePort};
use crate::application::services::PersistenceCoordinator;
use crate::domain::signal_lifecycle::{SignalRepository, SignalStatus, SignalStore, WriteOp};

/// Result of an archive pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Signals exported and marked archived.
    pub exported: usize,
    /// Signals removed after retention.
    pub deleted: usize,
    /// Export failed; the same signals are retried next pass.
    pub export_failed: bool,
}

/// Use case for moving terminal signals to cold storage.
pub struct ArchiveSignalsUseCase<S, C>
where
    S: SignalStore + ?Sized,
    C: ColdStorePort + ?Sized,
{
    coordinator: Arc<PersistenceCoordinator<S>>,
    cold_store: Arc<C>,
    retention: Duration,
}

impl<S, C> ArchiveSignalsUseCase<S, C>
where
    S: SignalStore + ?Sized,
    C: ColdStorePort + ?Sized,
{
    /// Create a new ArchiveSignalsUseCase.
    pub const fn new(
        coordinator: Arc<PersistenceCoordinator<S>>,
        cold_store: Arc<C>,
        retention: Duration,
    ) -> Self {
        Self {
            coordinator,
            cold_store,
            retention,
        }
    }

    /// Export newly terminal signals, then delete those past retention.
    ///
    /// Export is at-least-once: a signal is only marked archived after the
    /// cold store accepted it, so a crash in between exports it again.
    ///
    /// # Errors
    ///
    /// Returns store errors. Cold store failures are logged and reported.
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<ArchiveReport, UseCaseError> {
        let store = self.coordinator.store();
        let terminal = store.find_by_status(&SignalStatus::TERMINAL).await?;
        let mut report = ArchiveReport::default();

        let mut entries = Vec::new();
        for signal in terminal.iter().filter(|s| s.archived_at().is_none()) {
            let records = store.records_for_signal(signal.id()).await?;
            entries.push(ArchiveEntry {
                signal: signal.clone(),
                records,
                archived_at: now,
            });
        }

        if !entries.is_empty() {
            match self.cold_store.export(&entries).await {
                Ok(()) => {
                    let ops = entries
                        .iter()
                        .map(|entry| WriteOp::MarkArchived {
                            signal_id: entry.signal.id().clone(),
                            at: now,
                        })
                        .collect();
                    self.coordinator.commit(ops).await?;
                    report.exported = entries.len();
                    tracing::info!(count = report.exported, "Signals archived");
                }
                Err(e) => {
                    tracing::warn!(
                        count = entries.len(),
                        error = %e,
                        "Cold store export failed, retrying next pass"
                    );
                    report.export_failed = true;
                }
            }
        }

        let cutoff = now - self.retention;
        let expired: Vec<WriteOp> = terminal
            .iter()
            .filter(|s| s.archived_at().is_some_and(|at| at <= cutoff))
            .map(|s| WriteOp::DeleteSignal(s.id().clone()))
            .collect();
        if !expired.is_empty() {
            report.deleted = expired.len();
            self.coordinator.commit(expired).await?;
            tracing::info!(count = report.deleted, "Archived signals removed");
        }

        Ok(report)
    }
}
