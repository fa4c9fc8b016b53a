//! Cycle Scheduler
//!
//! Drives the periodic work: a reconciliation cycle, the expiry sweep and the
//! archive pass, once per tick until shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::backoff::duration_ms;
use crate::application::ports::{BrokerPort, ColdStorePort, NotificationSink};
use crate::application::use_cases::{
    ArchiveReport, ArchiveSignalsUseCase, CycleReport, ExpireStaleSignalsUseCase, ExpiryReport,
    ReconcileUseCase,
};
use crate::domain::signal_lifecycle::SignalStore;

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time between ticks.
    #[serde(with = "duration_ms")]
    pub interval: Duration,
    /// Run reconciliation each tick.
    pub reconcile_enabled: bool,
    /// Run the expiry sweep each tick.
    pub expiry_enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            reconcile_enabled: true,
            expiry_enabled: true,
        }
    }
}

/// What one tick did.
#[derive(Debug, Default)]
pub struct TickSummary {
    /// Reconciliation result, if it ran and could read the store.
    pub cycle: Option<CycleReport>,
    /// Expiry result, if it ran.
    pub expiry: Option<ExpiryReport>,
    /// Archive result, if it ran.
    pub archive: Option<ArchiveReport>,
}

/// Periodic scheduler.
pub struct CycleScheduler<B, S, N, C>
where
    B: BrokerPort + ?Sized,
    S: SignalStore + ?Sized,
    N: NotificationSink + ?Sized,
    C: ColdStorePort + ?Sized,
{
    reconcile: Arc<ReconcileUseCase<B, S, N>>,
    expire: Arc<ExpireStaleSignalsUseCase<S, N>>,
    archive: Option<Arc<ArchiveSignalsUseCase<S, C>>>,
    config: SchedulerConfig,
}

impl<B, S, N, C> CycleScheduler<B, S, N, C>
where
    B: BrokerPort + ?Sized,
    S: SignalStore + ?Sized,
    N: NotificationSink + ?Sized,
    C: ColdStorePort + ?Sized,
{
    /// Create a scheduler. Pass `None` for `archive` to disable archival.
    pub const fn new(
        reconcile: Arc<ReconcileUseCase<B, S, N>>,
        expire: Arc<ExpireStaleSignalsUseCase<S, N>>,
        archive: Option<Arc<ArchiveSignalsUseCase<S, C>>>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            reconcile,
            expire,
            archive,
            config,
        }
    }

    /// Tick until `shutdown` is cancelled.
    ///
    /// A tick in progress when shutdown arrives stops at its next
    /// cancellation point; commits already started complete.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            reconcile = self.config.reconcile_enabled,
            expiry = self.config.expiry_enabled,
            archive = self.archive.is_some(),
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(&shutdown).await;
                }
                () = shutdown.cancelled() => {
                    tracing::info!("Scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// Run one tick.
    pub async fn tick(&self, shutdown: &CancellationToken) -> TickSummary {
        let mut summary = TickSummary::default();

        if self.config.reconcile_enabled {
            match self.reconcile.execute_with_cancel(shutdown).await {
                Ok(report) => summary.cycle = Some(report),
                Err(e) => tracing::error!(error = %e, "Reconciliation cycle could not start"),
            }
        }

        if shutdown.is_cancelled() {
            return summary;
        }

        if self.config.expiry_enabled {
            match self.expire.execute(Utc::now()).await {
                Ok(report) => summary.expiry = Some(report),
                Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
            }
        }

        if let Some(archive) = &self.archive
            && !shutdown.is_cancelled()
        {
            match archive.execute(Utc::now()).await {
                Ok(report) => summary.archive = Some(report),
                Err(e) => tracing::error!(error = %e, "Archive pass failed"),
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ArchiveEntry, ColdStoreError};
    use crate::application::services::{
        BrokerGateway, GatewayConfig, NotificationGate, NotificationPolicy,
        PersistenceCoordinator,
    };
    use crate::application::test_support::RecordingSink;
    use crate::application::use_cases::{ReconcileConfig, TransitionSignalUseCase};
    use crate::domain::shared::SignalId;
    use crate::domain::signal_lifecycle::aggregate::test_support::signal_in;
    use crate::domain::signal_lifecycle::{
        Position, SignalRepository, SignalStatus, UnitOfWork, WriteOp,
    };
    use crate::infrastructure::broker::SimulatedBroker;
    use crate::infrastructure::persistence::InMemorySignalStore;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct NullColdStore;

    #[async_trait]
    impl ColdStorePort for NullColdStore {
        async fn export(&self, _entries: &[ArchiveEntry]) -> Result<(), ColdStoreError> {
            Ok(())
        }
    }

    fn scheduler(
        store: &Arc<InMemorySignalStore>,
        config: SchedulerConfig,
    ) -> CycleScheduler<SimulatedBroker, InMemorySignalStore, RecordingSink, NullColdStore> {
        let coordinator = Arc::new(PersistenceCoordinator::new(Arc::clone(store)));
        let gate = Arc::new(NotificationGate::new(
            Arc::new(RecordingSink::new()),
            NotificationPolicy::default(),
        ));
        let gateway = Arc::new(BrokerGateway::new(
            Arc::new(SimulatedBroker::new()),
            GatewayConfig::default(),
        ));
        let reconcile = Arc::new(ReconcileUseCase::new(
            gateway,
            Arc::clone(&coordinator),
            Arc::clone(&gate),
            ReconcileConfig::default(),
        ));
        let transitions = Arc::new(TransitionSignalUseCase::new(Arc::clone(&coordinator), gate));
        let expire = Arc::new(ExpireStaleSignalsUseCase::new(Arc::clone(store), transitions));
        let archive = Arc::new(ArchiveSignalsUseCase::new(
            coordinator,
            Arc::new(NullColdStore),
            chrono::Duration::days(30),
        ));
        CycleScheduler::new(reconcile, expire, Some(archive), config)
    }

    async fn seeded() -> Arc<InMemorySignalStore> {
        let store = Arc::new(InMemorySignalStore::new());
        let signal = signal_in("sig-1", "AAPL", SignalStatus::Active);
        let position = Position::open(
            signal.id().clone(),
            signal.symbol().clone(),
            dec!(100),
            dec!(5),
            dec!(95),
            Utc::now(),
        );
        store
            .apply_batch(vec![
                WriteOp::InsertSignal(signal),
                WriteOp::UpsertPosition(position),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn tick_runs_each_stage() {
        let store = seeded().await;
        let scheduler = scheduler(&store, SchedulerConfig::default());

        let summary = scheduler.tick(&CancellationToken::new()).await;

        let cycle = summary.cycle.unwrap();
        assert_eq!(cycle.corrections_committed, 1);
        assert!(summary.expiry.is_some());
        assert_eq!(summary.archive.unwrap().exported, 1);
    }

    #[tokio::test]
    async fn disabled_reconcile_is_skipped() {
        let store = seeded().await;
        let scheduler = scheduler(
            &store,
            SchedulerConfig {
                reconcile_enabled: false,
                ..SchedulerConfig::default()
            },
        );

        let summary = scheduler.tick(&CancellationToken::new()).await;
        assert!(summary.cycle.is_none());
        let signal = store.find_by_id(&SignalId::new("sig-1")).await.unwrap().unwrap();
        assert_eq!(signal.status(), SignalStatus::Active);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let store = seeded().await;
        let scheduler = Arc::new(scheduler(
            &store,
            SchedulerConfig {
                interval: Duration::from_millis(10),
                ..SchedulerConfig::default()
            },
        ));
        let shutdown = CancellationToken::new();
        let handle = {
            let scheduler = Arc::clone(&scheduler);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        let signal = store.find_by_id(&SignalId::new("sig-1")).await.unwrap().unwrap();
        assert_eq!(signal.status(), SignalStatus::ClosedManual);
    }
}
