//! Persistence Coordinator
//!
//! The single path for cross-record writes to the operational store, plus the
//! per-signal locks that keep one transition per signal in flight.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::shared::SignalId;
use crate::domain::signal_lifecycle::{CommitReceipt, PersistenceError, SignalStore, WriteOp};
use crate::telemetry;

/// Lock table size above which idle entries are pruned.
const PRUNE_THRESHOLD: usize = 1024;

/// Held while a signal's transition is in flight.
pub type SignalGuard = OwnedMutexGuard<()>;

/// Per-key async locks.
#[derive(Debug, Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<SignalId, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    async fn lock(&self, id: &SignalId) -> SignalGuard {
        let lock = {
            let mut locks = self.locks.lock();
            if locks.len() > PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Persistence coordinator.
pub struct PersistenceCoordinator<S>
where
    S: SignalStore + ?Sized,
{
    store: Arc<S>,
    locks: KeyedLocks,
}

impl<S> PersistenceCoordinator<S>
where
    S: SignalStore + ?Sized,
{
    /// Create a coordinator over a store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: KeyedLocks::default(),
        }
    }

    /// Read access to the store.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Wait for exclusive access to a signal.
    pub async fn lock(&self, signal_id: &SignalId) -> SignalGuard {
        self.locks.lock(signal_id).await
    }

    /// Commit a batch atomically.
    ///
    /// # Errors
    ///
    /// Returns the store's error; nothing from the batch is applied.
    pub async fn commit(&self, ops: Vec<WriteOp>) -> Result<CommitReceipt, PersistenceError> {
        let labels: Vec<&'static str> = ops.iter().map(WriteOp::label).collect();

        match self.store.apply_batch(ops).await {
            Ok(receipt) => {
                tracing::debug!(ops = ?labels, "Batch committed");
                Ok(receipt)
            }
            Err(e) => {
                telemetry::record_commit_failure(e.kind());
                tracing::warn!(ops = ?labels, error = %e, "Batch rejected, nothing applied");
                Err(e)
            }
        }
    }
}
