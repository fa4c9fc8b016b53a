//! Transition Signal Use Case

use std::sync::Arc;

use chrono::Utc;

use super::error::UseCaseError;
use crate::application::ports::{Notification, NotificationSink};
use crate::application::services::{GateOutcome, NotificationGate, PersistenceCoordinator};
use crate::domain::shared::SignalId;
use crate::domain::signal_lifecycle::{
    Signal, SignalRepository, SignalStateMachine, SignalStatus, SignalStore, TransitionOutcome,
    WriteOp,
};

/// Result of a requested transition.
#[derive(Debug, Clone)]
pub struct TransitionReport {
    /// Signal after the request.
    pub signal: Signal,
    /// What the state machine did.
    pub outcome: TransitionOutcome,
    /// Notification result, if one was sent.
    pub notification: Option<GateOutcome>,
}

/// Use case for caller-requested status changes.
pub struct TransitionSignalUseCase<S, N>
where
    S: SignalStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    coordinator: Arc<PersistenceCoordinator<S>>,
    gate: Arc<NotificationGate<N>>,
}

impl<S, N> TransitionSignalUseCase<S, N>
where
    S: SignalStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    /// Create a new TransitionSignalUseCase.
    pub const fn new(
        coordinator: Arc<PersistenceCoordinator<S>>,
        gate: Arc<NotificationGate<N>>,
    ) -> Self {
        Self { coordinator, gate }
    }

    /// Move a signal to `requested`.
    ///
    /// Holds the signal's lock for load, apply and commit; the notification
    /// is queued after the lock is released. Leaving a position-holding
    /// status deletes the position in the same batch.
    ///
    /// # Errors
    ///
    /// Returns lifecycle errors for forbidden moves and store errors if the
    /// commit is rejected; in both cases nothing is notified.
    pub async fn execute(
        &self,
        signal_id: &SignalId,
        requested: SignalStatus,
    ) -> Result<TransitionReport, UseCaseError> {
        let guard = self.coordinator.lock(signal_id).await;

        let current = self
            .coordinator
            .store()
            .find_by_id(signal_id)
            .await?
            .ok_or_else(|| UseCaseError::SignalNotFound(signal_id.clone()))?;

        let now = Utc::now();
        let (mut signal, outcome) = SignalStateMachine::apply(current, requested, now)?;

        let TransitionOutcome::Applied { from, to } = outcome else {
            tracing::info!(
                signal_id = %signal_id,
                status = %signal.status(),
                requested = %requested,
                outcome = ?outcome,
                "Transition request left signal unchanged"
            );
            return Ok(TransitionReport {
                signal,
                outcome,
                notification: None,
            });
        };

        let mut ops = vec![WriteOp::UpdateSignal(signal.clone())];
        if from.holds_position() && !to.holds_position() {
            ops.push(WriteOp::DeletePosition(signal_id.clone()));
        }

        let commit = self.coordinator.commit(ops).await;
        drop(guard);
        let notification = self
            .gate
            .notify(&Notification::status_changed(&signal, from, now), &commit);
        commit?;
        signal.advance_version();

        tracing::info!(
            signal_id = %signal_id,
            from = %from,
            to = %to,
            "Signal transitioned"
        );

        Ok(TransitionReport {
            signal,
            outcome,
            notification: Some(notification),
        })
    }
}
