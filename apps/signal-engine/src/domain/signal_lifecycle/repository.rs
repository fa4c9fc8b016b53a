//! Signal Repository Traits
//!
//! Persistence abstractions for the operational store. Reads go through
//! [`SignalRepository`]; every cross-record mutation goes through
//! [`UnitOfWork::apply_batch`] so it is applied atomically or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::aggregate::{Position, Signal};
use super::errors::PersistenceError;
use super::value_objects::SignalStatus;
use crate::domain::reconciliation::ReconciliationRecord;
use crate::domain::shared::{SignalId, Symbol};

/// A single write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert a new signal. Fails with `Duplicate` if the id exists.
    InsertSignal(Signal),
    /// Replace a stored signal.
    ///
    /// The signal's `version()` is the version the caller read; the store
    /// rejects the batch with `VersionConflict` if it has moved on.
    UpdateSignal(Signal),
    /// Remove a signal and its position.
    DeleteSignal(SignalId),
    /// Insert or replace the position linked to a signal.
    UpsertPosition(Position),
    /// Remove the position linked to a signal, if any.
    DeletePosition(SignalId),
    /// Append a reconciliation record.
    AppendRecord(ReconciliationRecord),
    /// Mark a signal as exported to cold storage.
    MarkArchived {
        /// Archived signal.
        signal_id: SignalId,
        /// Export time.
        at: DateTime<Utc>,
    },
}

impl WriteOp {
    /// Short label for logging.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InsertSignal(_) => "insert_signal",
            Self::UpdateSignal(_) => "update_signal",
            Self::DeleteSignal(_) => "delete_signal",
            Self::UpsertPosition(_) => "upsert_position",
            Self::DeletePosition(_) => "delete_position",
            Self::AppendRecord(_) => "append_record",
            Self::MarkArchived { .. } => "mark_archived",
        }
    }

    /// Signal the write touches, if any.
    #[must_use]
    pub fn signal_id(&self) -> Option<&SignalId> {
        match self {
            Self::InsertSignal(signal) | Self::UpdateSignal(signal) => Some(signal.id()),
            Self::DeleteSignal(id) | Self::DeletePosition(id) => Some(id),
            Self::UpsertPosition(position) => Some(&position.signal_id),
            Self::AppendRecord(record) => record.signal_id.as_ref(),
            Self::MarkArchived { signal_id, .. } => Some(signal_id),
        }
    }
}

/// Proof that a batch was durably applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Number of writes applied.
    pub ops_applied: usize,
    /// When the commit completed.
    pub committed_at: DateTime<Utc>,
}

/// Read side of the operational store.
#[async_trait]
pub trait SignalRepository: Send + Sync {
    /// Find a signal by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_id(&self, id: &SignalId) -> Result<Option<Signal>, PersistenceError>;

    /// Find signals in any of the given statuses, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_status(
        &self,
        statuses: &[SignalStatus],
    ) -> Result<Vec<Signal>, PersistenceError>;

    /// Find all signals that can still change.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_non_terminal(&self) -> Result<Vec<Signal>, PersistenceError> {
        self.find_by_status(&SignalStatus::NON_TERMINAL).await
    }

    /// Position linked to a signal.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn position_for(&self, signal_id: &SignalId)
        -> Result<Option<Position>, PersistenceError>;

    /// All stored positions.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn positions(&self) -> Result<Vec<Position>, PersistenceError>;

    /// Reconciliation records, oldest first, optionally for one symbol.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn records(
        &self,
        symbol: Option<&Symbol>,
    ) -> Result<Vec<ReconciliationRecord>, PersistenceError>;

    /// Reconciliation records linked to a signal.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn records_for_signal(
        &self,
        signal_id: &SignalId,
    ) -> Result<Vec<ReconciliationRecord>, PersistenceError>;
}

/// Write side of the operational store.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Apply every write in `ops` atomically.
    ///
    /// On error nothing from the batch is visible. The store also rejects a
    /// batch that would leave a position linked to a signal that no longer
    /// holds one.
    ///
    /// # Errors
    ///
    /// Returns `VersionConflict`, `Duplicate`, `NotFound` or `CommitFailed`
    /// for rejected batches and `Storage` for backend failures.
    async fn apply_batch(&self, ops: Vec<WriteOp>) -> Result<CommitReceipt, PersistenceError>;
}

/// A complete operational store.
pub trait SignalStore: SignalRepository + UnitOfWork {}

impl<T: SignalRepository + UnitOfWork + ?Sized> SignalStore for T {}
