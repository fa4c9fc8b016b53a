//! Expire Stale Signals Use Case
//!
//! Sweeps `WAITING` signals whose validity window has closed and moves them
//! to `EXPIRED` through the regular transition path.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::error::UseCaseError;
use super::transition_signal::TransitionSignalUseCase;
use crate::application::ports::NotificationSink;
use crate::domain::shared::SignalId;
use crate::domain::signal_lifecycle::{SignalRepository, SignalStatus, SignalStore};

/// Result of an expiry sweep.
#[derive(Debug, Default)]
pub struct ExpiryReport {
    /// Signals moved to `EXPIRED`.
    pub expired: Vec<SignalId>,
    /// Signals that could not be expired this sweep.
    pub failed: Vec<(SignalId, UseCaseError)>,
}

/// Use case for expiring signals past their validity window.
pub struct ExpireStaleSignalsUseCase<S, N>
where
    S: SignalStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    store: Arc<S>,
    transitions: Arc<TransitionSignalUseCase<S, N>>,
}

impl<S, N> ExpireStaleSignalsUseCase<S, N>
where
    S: SignalStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    /// Create a new ExpireStaleSignalsUseCase.
    pub const fn new(store: Arc<S>, transitions: Arc<TransitionSignalUseCase<S, N>>) -> Self {
        Self { store, transitions }
    }

    /// Expire every `WAITING` signal with `valid_until <= now`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the sweep cannot list signals. Per-signal
    /// failures are collected in the report.
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<ExpiryReport, UseCaseError> {
        let waiting = self.store.find_by_status(&[SignalStatus::Waiting]).await?;
        let mut report = ExpiryReport::default();

        for signal in waiting.into_iter().filter(|s| s.is_stale_at(now)) {
            let id = signal.id().clone();
            match self.transitions.execute(&id, SignalStatus::Expired).await {
                Ok(result) if result.outcome.is_applied() => report.expired.push(id),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(signal_id = %id, error = %e, "Failed to expire signal");
                    report.failed.push((id, e));
                }
            }
        }

        if !report.expired.is_empty() {
            tracing::info!(count = report.expired.len(), "Expired stale signals");
        }
        Ok(report)
    }
}
