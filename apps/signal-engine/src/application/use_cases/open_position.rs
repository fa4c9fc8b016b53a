//! Open Position Use Case

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::error::UseCaseError;
use crate::application::ports::{Notification, NotificationSink};
use crate::application::services::{NotificationGate, PersistenceCoordinator};
use crate::domain::shared::SignalId;
use crate::domain::signal_lifecycle::{
    Position, Signal, SignalRepository, SignalStateMachine, SignalStatus, SignalStore,
    TransitionOutcome, WriteOp,
};

/// A filled entry reported by the execution side.
#[derive(Debug, Clone)]
pub struct EntryFill {
    /// Signal whose entry filled.
    pub signal_id: SignalId,
    /// Average fill price.
    pub fill_price: Decimal,
    /// Filled quantity.
    pub quantity: Decimal,
    /// Fill time.
    pub filled_at: DateTime<Utc>,
}

/// Use case for recording a filled entry.
pub struct OpenPositionUseCase<S, N>
where
    S: SignalStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    coordinator: Arc<PersistenceCoordinator<S>>,
    gate: Arc<NotificationGate<N>>,
}

impl<S, N> OpenPositionUseCase<S, N>
where
    S: SignalStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    /// Create a new OpenPositionUseCase.
    pub const fn new(
        coordinator: Arc<PersistenceCoordinator<S>>,
        gate: Arc<NotificationGate<N>>,
    ) -> Self {
        Self { coordinator, gate }
    }

    /// Move the signal to `ACTIVE` and store its position in one commit.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for non-positive fills or terminal signals,
    /// lifecycle errors if the signal is past `WAITING`, and store errors.
    pub async fn execute(&self, fill: EntryFill) -> Result<(Signal, Position), UseCaseError> {
        if fill.quantity <= Decimal::ZERO || fill.fill_price <= Decimal::ZERO {
            return Err(UseCaseError::InvalidRequest(format!(
                "fill for {} must have positive price and quantity",
                fill.signal_id
            )));
        }

        let guard = self.coordinator.lock(&fill.signal_id).await;

        let current = self
            .coordinator
            .store()
            .find_by_id(&fill.signal_id)
            .await?
            .ok_or_else(|| UseCaseError::SignalNotFound(fill.signal_id.clone()))?;

        let now = Utc::now();
        let (mut signal, outcome) =
            SignalStateMachine::apply(current, SignalStatus::Active, now)?;
        let TransitionOutcome::Applied { from, .. } = outcome else {
            return Err(UseCaseError::InvalidRequest(format!(
                "signal {} is already {}",
                fill.signal_id,
                signal.status()
            )));
        };

        let position = Position::open(
            fill.signal_id.clone(),
            signal.symbol().clone(),
            fill.fill_price,
            fill.quantity,
            signal.levels().stop_loss,
            fill.filled_at,
        );

        let commit = self
            .coordinator
            .commit(vec![
                WriteOp::UpdateSignal(signal.clone()),
                WriteOp::UpsertPosition(position.clone()),
            ])
            .await;
        drop(guard);
        self.gate
            .notify(&Notification::status_changed(&signal, from, now), &commit);
        commit?;
        signal.advance_version();

        tracing::info!(
            signal_id = %fill.signal_id,
            symbol = %signal.symbol(),
            quantity = %fill.quantity,
            fill_price = %fill.fill_price,
            "Position opened"
        );
        Ok((signal, position))
    }
}
