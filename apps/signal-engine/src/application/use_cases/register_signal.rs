//! Register Signal Use Case

use std::sync::Arc;

use chrono::Utc;

use super::error::UseCaseError;
use crate::application::ports::{Notification, NotificationSink};
use crate::application::services::{NotificationGate, PersistenceCoordinator};
use crate::domain::signal_lifecycle::{CreateSignalCommand, Signal, SignalStore, WriteOp};

/// Use case for accepting a new signal from the strategy layer.
pub struct RegisterSignalUseCase<S, N>
where
    S: SignalStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    coordinator: Arc<PersistenceCoordinator<S>>,
    gate: Arc<NotificationGate<N>>,
}

impl<S, N> RegisterSignalUseCase<S, N>
where
    S: SignalStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    /// Create a new RegisterSignalUseCase.
    pub const fn new(
        coordinator: Arc<PersistenceCoordinator<S>>,
        gate: Arc<NotificationGate<N>>,
    ) -> Self {
        Self { coordinator, gate }
    }

    /// Validate and store a `WAITING` signal.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignal` for incomplete signals and `Duplicate` if the id
    /// is already stored.
    pub async fn execute(&self, command: CreateSignalCommand) -> Result<Signal, UseCaseError> {
        let signal = Signal::new(command, Utc::now()).inspect_err(|e| {
            tracing::warn!(error = %e, "Signal rejected");
        })?;

        let commit = self
            .coordinator
            .commit(vec![WriteOp::InsertSignal(signal.clone())])
            .await;
        self.gate.notify(&Notification::registered(&signal), &commit);
        commit?;

        tracing::info!(
            signal_id = %signal.id(),
            strategy_id = %signal.strategy_id(),
            symbol = %signal.symbol(),
            valid_until = %signal.valid_until(),
            "Signal registered"
        );
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::NotificationPolicy;
    use crate::application::test_support::RecordingSink;
    use crate::domain::shared::{SignalId, StrategyId, Symbol};
    use crate::domain::signal_lifecycle::{
        AssetClass, PersistenceError, PriceLevels, SignalError, SignalRepository, SignalStatus,
    };
    use crate::infrastructure::persistence::InMemorySignalStore;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn command(id: &str) -> CreateSignalCommand {
        CreateSignalCommand {
            id: SignalId::new(id),
            strategy_id: StrategyId::new("breakout"),
            symbol: Symbol::new("BTC/USD"),
            asset_class: AssetClass::Crypto,
            levels: PriceLevels::new(
                dec!(60000),
                dec!(58000),
                [dec!(62000), dec!(64000), dec!(68000)],
            ),
            valid_until: Utc::now() + Duration::hours(2),
            notification_thread: None,
        }
    }

    fn use_case(
        store: Arc<InMemorySignalStore>,
        sink: Arc<RecordingSink>,
    ) -> (
        RegisterSignalUseCase<InMemorySignalStore, RecordingSink>,
        Arc<NotificationGate<RecordingSink>>,
    ) {
        let gate = Arc::new(NotificationGate::new(sink, NotificationPolicy::default()));
        let use_case = RegisterSignalUseCase::new(
            Arc::new(PersistenceCoordinator::new(store)),
            Arc::clone(&gate),
        );
        (use_case, gate)
    }

    #[tokio::test]
    async fn registers_waiting_signal_and_notifies() {
        let store = Arc::new(InMemorySignalStore::new());
        let sink = Arc::new(RecordingSink::new());
        let (use_case, gate) = use_case(Arc::clone(&store), Arc::clone(&sink));
        let signal = use_case.execute(command("sig-1")).await.unwrap();

        assert_eq!(signal.status(), SignalStatus::Waiting);
        assert!(store.find_by_id(signal.id()).await.unwrap().is_some());
        gate.drain().await;
        assert_eq!(sink.delivered().len(), 1);
    }

    #[tokio::test]
    async fn rejects_incomplete_signal() {
        let store = Arc::new(InMemorySignalStore::new());
        let sink = Arc::new(RecordingSink::new());
        let mut cmd = command("sig-1");
        cmd.levels.stop_loss = dec!(0);

        let (use_case, _gate) = use_case(Arc::clone(&store), Arc::clone(&sink));
        let err = use_case.execute(cmd).await.unwrap_err();

        assert!(matches!(err, UseCaseError::Signal(SignalError::InvalidSignal { .. })));
        assert!(store.is_empty());
        assert_eq!(sink.calls(), 0);
    }

    #[tokio::test]
    async fn duplicate_registration_fails_without_notification() {
        let store = Arc::new(InMemorySignalStore::new());
        let sink = Arc::new(RecordingSink::new());
        let (use_case, gate) = use_case(Arc::clone(&store), Arc::clone(&sink));

        use_case.execute(command("sig-1")).await.unwrap();
        let err = use_case.execute(command("sig-1")).await.unwrap_err();

        assert!(matches!(err, UseCaseError::Persistence(PersistenceError::Duplicate(_))));
        gate.drain().await;
        assert_eq!(sink.calls(), 1);
    }
}
