//! Submit Signal Order Use Case

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use super::error::UseCaseError;
use crate::application::ports::{BrokerPort, OrderSide};
use crate::application::services::{
    BrokerGateway, OrderIntent, OrderPurpose, PersistenceCoordinator, Placement,
};
use crate::domain::shared::SignalId;
use crate::domain::signal_lifecycle::{
    Direction, Signal, SignalRepository, SignalStatus, SignalStore, WriteOp,
};

/// Result of submitting a signal's entry order.
#[derive(Debug, Clone)]
pub struct SubmitReport {
    /// Signal with the order linked.
    pub signal: Signal,
    /// Broker placement.
    pub placement: Placement,
}

/// Use case for placing a signal's entry order at the broker.
pub struct SubmitSignalOrderUseCase<B, S>
where
    B: BrokerPort + ?Sized,
    S: SignalStore + ?Sized,
{
    gateway: Arc<BrokerGateway<B>>,
    coordinator: Arc<PersistenceCoordinator<S>>,
}

impl<B, S> SubmitSignalOrderUseCase<B, S>
where
    B: BrokerPort + ?Sized,
    S: SignalStore + ?Sized,
{
    /// Create a new SubmitSignalOrderUseCase.
    pub const fn new(
        gateway: Arc<BrokerGateway<B>>,
        coordinator: Arc<PersistenceCoordinator<S>>,
    ) -> Self {
        Self {
            gateway,
            coordinator,
        }
    }

    /// Place a limit entry order at the signal's entry price and link it.
    ///
    /// Safe to call repeatedly: the broker order is keyed on the signal, so a
    /// retry after a lost response links the existing order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` unless the signal is `WAITING` and the
    /// quantity is positive.
    pub async fn execute(
        &self,
        signal_id: &SignalId,
        quantity: Decimal,
    ) -> Result<SubmitReport, UseCaseError> {
        if quantity <= Decimal::ZERO {
            return Err(UseCaseError::InvalidRequest(format!(
                "order quantity must be positive, got {quantity}"
            )));
        }

        let _guard = self.coordinator.lock(signal_id).await;

        let mut signal = self
            .coordinator
            .store()
            .find_by_id(signal_id)
            .await?
            .ok_or_else(|| UseCaseError::SignalNotFound(signal_id.clone()))?;

        if signal.status() != SignalStatus::Waiting {
            return Err(UseCaseError::InvalidRequest(format!(
                "signal {signal_id} is {}, entry orders need WAITING",
                signal.status()
            )));
        }

        let levels = signal.levels();
        let intent = OrderIntent {
            signal_id: signal_id.clone(),
            purpose: OrderPurpose::Entry,
            symbol: signal.symbol().clone(),
            side: match levels.direction() {
                Direction::Long => OrderSide::Buy,
                Direction::Short => OrderSide::Sell,
            },
            quantity,
            limit_price: Some(levels.entry),
        };

        let placement = self.gateway.place_order(&intent).await?;

        if signal.broker_order_id() != Some(&placement.order.broker_order_id) {
            signal.link_order(placement.order.broker_order_id.clone(), Utc::now());
            self.coordinator
                .commit(vec![WriteOp::UpdateSignal(signal.clone())])
                .await?;
            signal.advance_version();
        }

        Ok(SubmitReport { signal, placement })
    }
}
