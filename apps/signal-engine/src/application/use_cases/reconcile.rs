//! Reconcile Use Case
//!
//! One reconciliation cycle: compare stored positions and order links with
//! the broker and correct the store where the broker disagrees.
//!
//! Work is grouped per symbol. Symbols are processed concurrently up to
//! `max_concurrency`, and a failure on one symbol is recorded without touching
//! the others. The cycle runs under a deadline; once it passes, checks that
//! have not started committing are skipped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::error::UseCaseError;
use crate::application::ports::{BrokerPort, Notification, NotificationSink};
use crate::application::services::{
    BrokerGateway, NotificationGate, OrderLookup, PersistenceCoordinator, duration_ms,
};
use crate::domain::reconciliation::{MismatchClassifier, MismatchKind, ReconciliationRecord};
use crate::domain::shared::{BrokerOrderId, SignalId, Symbol};
use crate::domain::signal_lifecycle::{
    Position, SignalRepository, SignalStateMachine, SignalStatus, SignalStore, WriteOp,
};
use crate::telemetry;

/// Reconciliation cycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Symbols processed at once.
    pub max_concurrency: usize,
    /// Time budget for one cycle.
    #[serde(with = "duration_ms")]
    pub cycle_deadline: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            cycle_deadline: Duration::from_secs(30),
        }
    }
}

/// A check that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    /// Symbol being checked.
    pub symbol: Symbol,
    /// Signal being corrected, if the failure is tied to one.
    pub signal_id: Option<SignalId>,
    /// What went wrong.
    pub error: String,
}

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Non-terminal signals loaded.
    pub signals_checked: usize,
    /// Stored positions loaded.
    pub positions_checked: usize,
    /// Mismatches detected, by kind.
    pub mismatches: HashMap<MismatchKind, usize>,
    /// Corrections written to the store.
    pub corrections_committed: usize,
    /// Checks that failed.
    pub failures: Vec<CheckFailure>,
    /// Symbols whose holdings could not be fetched.
    pub skipped_symbols: Vec<Symbol>,
    /// Symbols not processed because the cycle was cut short.
    pub units_skipped: usize,
    /// The deadline passed before the cycle finished.
    pub deadline_hit: bool,
}

impl CycleReport {
    /// Mismatches of one kind.
    #[must_use]
    pub fn mismatch_count(&self, kind: MismatchKind) -> usize {
        self.mismatches.get(&kind).copied().unwrap_or(0)
    }

    /// Mismatches of every kind.
    #[must_use]
    pub fn total_mismatches(&self) -> usize {
        self.mismatches.values().sum()
    }

    /// Metric label.
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        if self.deadline_hit {
            "deadline"
        } else if !self.failures.is_empty() || !self.skipped_symbols.is_empty() {
            "partial"
        } else if self.total_mismatches() > 0 {
            "corrected"
        } else {
            "clean"
        }
    }
}

#[derive(Debug)]
enum Check {
    Position {
        position: Position,
        broker_quantity: Decimal,
    },
    Order {
        signal_id: SignalId,
        order_id: BrokerOrderId,
    },
}

#[derive(Debug)]
struct SymbolUnit {
    symbol: Symbol,
    checks: Vec<Check>,
}

#[derive(Debug, Default)]
struct UnitOutcome {
    mismatches: Vec<MismatchKind>,
    committed: usize,
    failures: Vec<CheckFailure>,
    skipped: bool,
}

enum Correction {
    Committed,
    /// The store changed since the mismatch was seen.
    Stale,
    /// The cycle was cancelled before committing.
    Skipped,
}

/// Use case for reconciling the store with the broker.
pub struct ReconcileUseCase<B, S, N>
where
    B: BrokerPort + ?Sized,
    S: SignalStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    gateway: Arc<BrokerGateway<B>>,
    coordinator: Arc<PersistenceCoordinator<S>>,
    gate: Arc<NotificationGate<N>>,
    config: ReconcileConfig,
}

impl<B, S, N> ReconcileUseCase<B, S, N>
where
    B: BrokerPort + ?Sized,
    S: SignalStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    /// Create a new ReconcileUseCase.
    pub const fn new(
        gateway: Arc<BrokerGateway<B>>,
        coordinator: Arc<PersistenceCoordinator<S>>,
        gate: Arc<NotificationGate<N>>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            gateway,
            coordinator,
            gate,
            config,
        }
    }

    /// Run one cycle.
    ///
    /// # Errors
    ///
    /// Returns error only if the store cannot be read at the start of the
    /// cycle. Everything after that is recorded in the report.
    pub async fn execute(&self) -> Result<CycleReport, UseCaseError> {
        self.execute_with_cancel(&CancellationToken::new()).await
    }

    /// Run one cycle that also stops when `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns error only if the store cannot be read at the start of the
    /// cycle.
    pub async fn execute_with_cancel(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<CycleReport, UseCaseError> {
        let started = Instant::now();
        let cancel = shutdown.child_token();
        let deadline_fired = Arc::new(AtomicBool::new(false));

        let watchdog = {
            let cancel = cancel.clone();
            let fired = Arc::clone(&deadline_fired);
            let deadline = self.config.cycle_deadline;
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                fired.store(true, Ordering::SeqCst);
                cancel.cancel();
            })
        };

        let result = self.run_cycle(&cancel).await;
        watchdog.abort();

        let mut report = result?;
        report.deadline_hit = deadline_fired.load(Ordering::SeqCst);

        let elapsed = started.elapsed();
        telemetry::record_cycle(report.outcome(), elapsed);
        if report.deadline_hit {
            tracing::warn!(
                deadline_ms = self.config.cycle_deadline.as_millis() as u64,
                units_skipped = report.units_skipped,
                corrections = report.corrections_committed,
                "Reconciliation cycle hit its deadline"
            );
        } else {
            tracing::info!(
                signals = report.signals_checked,
                positions = report.positions_checked,
                mismatches = report.total_mismatches(),
                corrections = report.corrections_committed,
                failures = report.failures.len(),
                skipped_symbols = report.skipped_symbols.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Reconciliation cycle complete"
            );
        }

        Ok(report)
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleReport, UseCaseError> {
        let store = self.coordinator.store();
        let signals = store.find_non_terminal().await?;
        let positions = store.positions().await?;

        let mut report = CycleReport {
            signals_checked: signals.len(),
            positions_checked: positions.len(),
            ..CycleReport::default()
        };

        let held: HashSet<SignalId> = positions.iter().map(|p| p.signal_id.clone()).collect();
        let mut grouped: BTreeMap<Symbol, Vec<Check>> = BTreeMap::new();

        for signal in &signals {
            if let Some(order_id) = signal.broker_order_id()
                && !held.contains(signal.id())
            {
                grouped
                    .entry(signal.symbol().clone())
                    .or_default()
                    .push(Check::Order {
                        signal_id: signal.id().clone(),
                        order_id: order_id.clone(),
                    });
            }
        }

        let position_symbols: Vec<Symbol> = positions.iter().map(|p| p.symbol.clone()).collect();
        let holdings = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let mut in_scope: HashSet<&Symbol> = grouped.keys().collect();
                in_scope.extend(position_symbols.iter());
                report.units_skipped = in_scope.len();
                return Ok(report);
            }
            holdings = self.gateway.fetch_holdings(&position_symbols) => holdings,
        };
        report.skipped_symbols = holdings.failed_symbols();

        for position in positions {
            if holdings.is_failed(&position.symbol) {
                continue;
            }
            let broker_quantity = holdings.quantity(&position.symbol).unwrap_or(Decimal::ZERO);
            grouped
                .entry(position.symbol.clone())
                .or_default()
                .push(Check::Position {
                    position,
                    broker_quantity,
                });
        }

        let units = grouped
            .into_iter()
            .map(|(symbol, checks)| SymbolUnit { symbol, checks });

        let outcomes: Vec<UnitOutcome> = stream::iter(units)
            .map(|unit| self.run_unit(unit, cancel))
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            for kind in outcome.mismatches {
                *report.mismatches.entry(kind).or_default() += 1;
            }
            report.corrections_committed += outcome.committed;
            report.failures.extend(outcome.failures);
            if outcome.skipped {
                report.units_skipped += 1;
            }
        }

        Ok(report)
    }

    async fn run_unit(&self, unit: SymbolUnit, cancel: &CancellationToken) -> UnitOutcome {
        let mut outcome = UnitOutcome::default();
        let symbol = unit.symbol;

        // Positions are compared against the symbol's total holding.
        let (position_checks, order_checks): (Vec<Check>, Vec<Check>) = unit
            .checks
            .into_iter()
            .partition(|c| matches!(c, Check::Position { .. }));

        if cancel.is_cancelled() {
            outcome.skipped = true;
            return outcome;
        }

        if let Err(e) = self
            .check_positions(&symbol, position_checks, cancel, &mut outcome)
            .await
        {
            outcome.failures.push(CheckFailure {
                symbol: symbol.clone(),
                signal_id: None,
                error: e.to_string(),
            });
        }

        for check in order_checks {
            if cancel.is_cancelled() {
                outcome.skipped = true;
                break;
            }
            let Check::Order {
                signal_id,
                order_id,
            } = check
            else {
                continue;
            };
            if let Err(e) = self
                .check_order(&symbol, &signal_id, &order_id, cancel, &mut outcome)
                .await
            {
                tracing::warn!(
                    symbol = %symbol,
                    signal_id = %signal_id,
                    error = %e,
                    "Order check failed"
                );
                outcome.failures.push(CheckFailure {
                    symbol: symbol.clone(),
                    signal_id: Some(signal_id),
                    error: e.to_string(),
                });
            }
        }

        outcome
    }

    async fn check_positions(
        &self,
        symbol: &Symbol,
        checks: Vec<Check>,
        cancel: &CancellationToken,
        outcome: &mut UnitOutcome,
    ) -> Result<(), UseCaseError> {
        let mut broker_quantity = Decimal::ZERO;
        let mut positions = Vec::with_capacity(checks.len());
        for check in checks {
            if let Check::Position {
                position,
                broker_quantity: held,
            } = check
            {
                broker_quantity = held;
                positions.push(position);
            }
        }
        if positions.is_empty() {
            return Ok(());
        }

        let stored: Decimal = positions.iter().map(|p| p.quantity.abs()).sum();
        let Some(kind) = MismatchClassifier::classify_position(stored, Some(broker_quantity))
        else {
            return Ok(());
        };

        outcome.mismatches.push(kind);
        telemetry::record_mismatch(kind.as_str());
        tracing::warn!(
            symbol = %symbol,
            kind = %kind,
            store_quantity = %stored,
            broker_quantity = %broker_quantity,
            positions = positions.len(),
            "Position mismatch"
        );

        match kind {
            MismatchKind::OrphanPosition => {
                for position in &positions {
                    if cancel.is_cancelled() {
                        outcome.skipped = true;
                        return Ok(());
                    }
                    match self.close_orphan(position, cancel).await {
                        Ok(Correction::Committed) => outcome.committed += 1,
                        Ok(Correction::Stale) => {}
                        Ok(Correction::Skipped) => outcome.skipped = true,
                        Err(e) => outcome.failures.push(CheckFailure {
                            symbol: symbol.clone(),
                            signal_id: Some(position.signal_id.clone()),
                            error: e.to_string(),
                        }),
                    }
                }
            }
            MismatchKind::QuantityDrift => match positions.as_slice() {
                [position] => match self.sync_drift(position, broker_quantity, cancel).await? {
                    Correction::Committed => outcome.committed += 1,
                    Correction::Stale => {}
                    Correction::Skipped => outcome.skipped = true,
                },
                _ => outcome.failures.push(CheckFailure {
                    symbol: symbol.clone(),
                    signal_id: None,
                    error: format!(
                        "quantity drift across {} positions cannot be attributed",
                        positions.len()
                    ),
                }),
            },
            MismatchKind::OrphanOrder => {}
        }

        Ok(())
    }

    /// Force the signal to `CLOSED_MANUAL`, drop its position and record why.
    async fn close_orphan(
        &self,
        seen: &Position,
        cancel: &CancellationToken,
    ) -> Result<Correction, UseCaseError> {
        let signal_id = &seen.signal_id;
        let guard = self.coordinator.lock(signal_id).await;
        let store = self.coordinator.store();

        let Some(position) = store.position_for(signal_id).await? else {
            return Ok(Correction::Stale);
        };
        let signal = store
            .find_by_id(signal_id)
            .await?
            .ok_or_else(|| UseCaseError::SignalNotFound(signal_id.clone()))?;

        let now = Utc::now();
        let (signal, transition) =
            SignalStateMachine::apply(signal, SignalStatus::ClosedManual, now)?;
        if !transition.is_applied() {
            return Ok(Correction::Stale);
        }

        let record = ReconciliationRecord::new(
            position.symbol.clone(),
            Some(signal_id.clone()),
            MismatchKind::OrphanPosition,
            position.quantity,
            Decimal::ZERO,
            now,
        );

        if cancel.is_cancelled() {
            return Ok(Correction::Skipped);
        }

        let commit = self
            .coordinator
            .commit(vec![
                WriteOp::UpdateSignal(signal.clone()),
                WriteOp::DeletePosition(signal_id.clone()),
                WriteOp::AppendRecord(record.clone()),
            ])
            .await;
        drop(guard);
        self.gate
            .notify(&Notification::reconciliation(&record, Some(&signal)), &commit);
        commit?;

        tracing::info!(
            signal_id = %signal_id,
            symbol = %position.symbol,
            quantity = %position.quantity,
            "Orphan position closed"
        );
        Ok(Correction::Committed)
    }

    /// Set the stored quantity to what the broker holds.
    async fn sync_drift(
        &self,
        seen: &Position,
        broker_quantity: Decimal,
        cancel: &CancellationToken,
    ) -> Result<Correction, UseCaseError> {
        let signal_id = &seen.signal_id;
        let guard = self.coordinator.lock(signal_id).await;
        let store = self.coordinator.store();

        let Some(mut position) = store.position_for(signal_id).await? else {
            return Ok(Correction::Stale);
        };
        if MismatchClassifier::classify_position(position.quantity, Some(broker_quantity))
            != Some(MismatchKind::QuantityDrift)
        {
            return Ok(Correction::Stale);
        }
        let signal = store.find_by_id(signal_id).await?;

        let now = Utc::now();
        let record = ReconciliationRecord::new(
            position.symbol.clone(),
            Some(signal_id.clone()),
            MismatchKind::QuantityDrift,
            position.quantity,
            broker_quantity,
            now,
        );
        position.sync_quantity(broker_quantity, now);

        if cancel.is_cancelled() {
            return Ok(Correction::Skipped);
        }

        let commit = self
            .coordinator
            .commit(vec![
                WriteOp::UpsertPosition(position),
                WriteOp::AppendRecord(record.clone()),
            ])
            .await;
        drop(guard);
        self.gate.notify(
            &Notification::reconciliation(&record, signal.as_ref()),
            &commit,
        );
        commit?;
        Ok(Correction::Committed)
    }

    async fn check_order(
        &self,
        symbol: &Symbol,
        signal_id: &SignalId,
        order_id: &BrokerOrderId,
        cancel: &CancellationToken,
        outcome: &mut UnitOutcome,
    ) -> Result<(), UseCaseError> {
        let lookup = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                outcome.skipped = true;
                return Ok(());
            }
            lookup = self.gateway.fetch_order_status(order_id) => lookup?,
        };

        let found = matches!(lookup, OrderLookup::Found(_));
        let Some(kind) = MismatchClassifier::classify_order(found) else {
            return Ok(());
        };

        outcome.mismatches.push(kind);
        telemetry::record_mismatch(kind.as_str());
        tracing::info!(
            symbol = %symbol,
            signal_id = %signal_id,
            broker_order_id = %order_id,
            "Linked order unknown to broker, treating as cancelled"
        );

        match self.clear_orphan_order(signal_id, order_id, cancel).await? {
            Correction::Committed => outcome.committed += 1,
            Correction::Stale => {}
            Correction::Skipped => outcome.skipped = true,
        }
        Ok(())
    }

    /// Drop a stale order link so the same orphan is not reported again.
    async fn clear_orphan_order(
        &self,
        signal_id: &SignalId,
        order_id: &BrokerOrderId,
        cancel: &CancellationToken,
    ) -> Result<Correction, UseCaseError> {
        let _guard = self.coordinator.lock(signal_id).await;
        let store = self.coordinator.store();

        let Some(mut signal) = store.find_by_id(signal_id).await? else {
            return Ok(Correction::Stale);
        };
        if signal.broker_order_id() != Some(order_id)
            || signal.is_terminal()
            || store.position_for(signal_id).await?.is_some()
        {
            return Ok(Correction::Stale);
        }

        let now = Utc::now();
        let record = ReconciliationRecord::new(
            signal.symbol().clone(),
            Some(signal_id.clone()),
            MismatchKind::OrphanOrder,
            Decimal::ZERO,
            Decimal::ZERO,
            now,
        );
        signal.clear_order_link(now);

        if cancel.is_cancelled() {
            return Ok(Correction::Skipped);
        }

        self.coordinator
            .commit(vec![
                WriteOp::UpdateSignal(signal),
                WriteOp::AppendRecord(record),
            ])
            .await?;
        Ok(Correction::Committed)
    }
}
