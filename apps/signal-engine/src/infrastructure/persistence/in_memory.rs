//! In-memory operational store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::reconciliation::ReconciliationRecord;
use crate::domain::shared::{SignalId, Symbol};
use crate::domain::signal_lifecycle::{
    CommitReceipt, PersistenceError, Position, Signal, SignalRepository, SignalStatus, UnitOfWork,
    WriteOp,
};

#[derive(Debug, Clone, Default)]
struct StoreState {
    signals: HashMap<SignalId, Signal>,
    positions: HashMap<SignalId, Position>,
    records: Vec<ReconciliationRecord>,
}

impl StoreState {
    fn apply(&mut self, op: WriteOp) -> Result<(), PersistenceError> {
        match op {
            WriteOp::InsertSignal(signal) => {
                if self.signals.contains_key(signal.id()) {
                    return Err(PersistenceError::Duplicate(format!("signal {}", signal.id())));
                }
                self.signals.insert(signal.id().clone(), signal);
            }
            WriteOp::UpdateSignal(mut signal) => {
                let stored = self
                    .signals
                    .get(signal.id())
                    .ok_or_else(|| PersistenceError::NotFound(format!("signal {}", signal.id())))?;
                if stored.version() != signal.version() {
                    return Err(PersistenceError::VersionConflict {
                        signal_id: signal.id().clone(),
                        expected: signal.version(),
                        actual: stored.version(),
                    });
                }
                signal.advance_version();
                self.signals.insert(signal.id().clone(), signal);
            }
            WriteOp::DeleteSignal(id) => {
                if self.signals.remove(&id).is_none() {
                    return Err(PersistenceError::NotFound(format!("signal {id}")));
                }
                self.positions.remove(&id);
            }
            WriteOp::UpsertPosition(position) => {
                if !self.signals.contains_key(&position.signal_id) {
                    return Err(PersistenceError::NotFound(format!(
                        "signal {} for position {}",
                        position.signal_id, position.id
                    )));
                }
                self.positions.insert(position.signal_id.clone(), position);
            }
            WriteOp::DeletePosition(id) => {
                self.positions.remove(&id);
            }
            WriteOp::AppendRecord(record) => {
                if self.records.iter().any(|r| r.id == record.id) {
                    return Err(PersistenceError::Duplicate(format!("record {}", record.id)));
                }
                self.records.push(record);
            }
            WriteOp::MarkArchived { signal_id, at } => {
                let signal = self
                    .signals
                    .get_mut(&signal_id)
                    .ok_or_else(|| PersistenceError::NotFound(format!("signal {signal_id}")))?;
                signal.mark_archived(at);
                signal.advance_version();
            }
        }
        Ok(())
    }

    /// A position may only exist while its signal holds one.
    fn check_positions(&self) -> Result<(), PersistenceError> {
        for (signal_id, position) in &self.positions {
            match self.signals.get(signal_id) {
                Some(signal) if signal.status().holds_position() => {}
                Some(signal) => {
                    return Err(PersistenceError::CommitFailed(format!(
                        "position {} left linked to {} signal {}",
                        position.id,
                        signal.status(),
                        signal_id
                    )));
                }
                None => {
                    return Err(PersistenceError::CommitFailed(format!(
                        "position {} has no signal {}",
                        position.id, signal_id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// In-memory implementation of the operational store.
///
/// A batch is applied to a copy of the state under the write lock and only
/// swapped in if every write succeeds. Suitable for testing and development.
#[derive(Debug, Default)]
pub struct InMemorySignalStore {
    state: RwLock<StoreState>,
    failures_pending: AtomicUsize,
}

impl InMemorySignalStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().signals.len()
    }

    /// Check if the store holds no signals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().signals.is_empty()
    }

    /// Reject the next `count` batches with `CommitFailed`.
    pub fn fail_next_commits(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    fn take_injected_failure(&self) -> bool {
        self.failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl SignalRepository for InMemorySignalStore {
    async fn find_by_id(&self, id: &SignalId) -> Result<Option<Signal>, PersistenceError> {
        Ok(self.state.read().signals.get(id).cloned())
    }

    async fn find_by_status(
        &self,
        statuses: &[SignalStatus],
    ) -> Result<Vec<Signal>, PersistenceError> {
        let state = self.state.read();
        let mut found: Vec<Signal> = state
            .signals
            .values()
            .filter(|s| statuses.contains(&s.status()))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(found)
    }

    async fn position_for(
        &self,
        signal_id: &SignalId,
    ) -> Result<Option<Position>, PersistenceError> {
        Ok(self.state.read().positions.get(signal_id).cloned())
    }

    async fn positions(&self) -> Result<Vec<Position>, PersistenceError> {
        let state = self.state.read();
        let mut positions: Vec<Position> = state.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        Ok(positions)
    }

    async fn records(
        &self,
        symbol: Option<&Symbol>,
    ) -> Result<Vec<ReconciliationRecord>, PersistenceError> {
        let state = self.state.read();
        Ok(state
            .records
            .iter()
            .filter(|r| symbol.is_none_or(|s| &r.symbol == s))
            .cloned()
            .collect())
    }

    async fn records_for_signal(
        &self,
        signal_id: &SignalId,
    ) -> Result<Vec<ReconciliationRecord>, PersistenceError> {
        let state = self.state.read();
        Ok(state
            .records
            .iter()
            .filter(|r| r.signal_id.as_ref() == Some(signal_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UnitOfWork for InMemorySignalStore {
    async fn apply_batch(&self, ops: Vec<WriteOp>) -> Result<CommitReceipt, PersistenceError> {
        if self.take_injected_failure() {
            return Err(PersistenceError::CommitFailed(
                "injected commit failure".to_string(),
            ));
        }

        let ops_applied = ops.len();
        let mut state = self.state.write();
        let mut staged = state.clone();

        for op in ops {
            staged.apply(op)?;
        }
        staged.check_positions()?;

        *state = staged;
        Ok(CommitReceipt {
            ops_applied,
            committed_at: Utc::now(),
        })
    }
}
