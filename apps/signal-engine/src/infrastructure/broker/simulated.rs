//! Simulated broker.
//!
//! In-process `BrokerPort` for paper runs and tests. Orders are keyed on the
//! client order ID, so resubmitting one is rejected as a duplicate the way a
//! real broker would.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::application::ports::{
    BrokerError, BrokerOrderStatus, BrokerPort, OrderSnapshot, SubmitOrderRequest,
};
use crate::domain::shared::{BrokerOrderId, ClientOrderId, Symbol};

#[derive(Debug, Default)]
struct BookState {
    holdings: HashMap<String, Decimal>,
    orders: HashMap<BrokerOrderId, OrderSnapshot>,
    ordered_qty: HashMap<BrokerOrderId, Decimal>,
    by_client_id: HashMap<ClientOrderId, BrokerOrderId>,
}

/// In-memory broker.
#[derive(Debug, Default)]
pub struct SimulatedBroker {
    state: RwLock<BookState>,
}

impl SimulatedBroker {
    /// Create a broker with no holdings and no orders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the quantity held for a symbol. Zero removes the holding.
    pub fn set_holding(&self, symbol: Symbol, quantity: Decimal) {
        let mut state = self.state.write();
        if quantity.is_zero() {
            state.holdings.remove(&symbol.holdings_key());
        } else {
            state.holdings.insert(symbol.holdings_key(), quantity);
        }
    }

    /// Mark an order filled and add it to holdings.
    ///
    /// Returns false if the broker does not know the order.
    pub fn fill_order(&self, order_id: &BrokerOrderId, price: Decimal) -> bool {
        let mut state = self.state.write();
        let Some(qty) = state.ordered_qty.get(order_id).copied() else {
            return false;
        };
        let Some(order) = state.orders.get_mut(order_id) else {
            return false;
        };
        order.status = BrokerOrderStatus::Filled;
        order.filled_qty = qty;
        order.avg_fill_price = Some(price);
        let key = order.symbol.holdings_key();
        *state.holdings.entry(key).or_default() += qty;
        true
    }

    /// Drop an order as if the broker had purged it.
    pub fn forget_order(&self, order_id: &BrokerOrderId) {
        let mut state = self.state.write();
        state.ordered_qty.remove(order_id);
        if let Some(order) = state.orders.remove(order_id) {
            state.by_client_id.remove(&order.client_order_id);
        }
    }

    /// Number of orders accepted.
    pub fn order_count(&self) -> usize {
        self.state.read().orders.len()
    }
}

#[async_trait]
impl BrokerPort for SimulatedBroker {
    async fn get_positions(
        &self,
        symbols: &[Symbol],
    ) -> Result<HashMap<Symbol, Decimal>, BrokerError> {
        let state = self.state.read();
        Ok(symbols
            .iter()
            .filter_map(|symbol| {
                state
                    .holdings
                    .get(&symbol.holdings_key())
                    .map(|qty| (symbol.clone(), *qty))
            })
            .collect())
    }

    async fn get_order(
        &self,
        broker_order_id: &BrokerOrderId,
    ) -> Result<Option<OrderSnapshot>, BrokerError> {
        Ok(self.state.read().orders.get(broker_order_id).cloned())
    }

    async fn find_order_by_client_id(
        &self,
        client_order_id: &ClientOrderId,
    ) -> Result<Option<OrderSnapshot>, BrokerError> {
        let state = self.state.read();
        Ok(state
            .by_client_id
            .get(client_order_id)
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn submit_order(&self, request: SubmitOrderRequest) -> Result<OrderSnapshot, BrokerError> {
        if request.quantity <= Decimal::ZERO {
            return Err(BrokerError::OrderRejected {
                reason: format!("quantity must be positive, got {}", request.quantity),
            });
        }

        let mut state = self.state.write();
        if state.by_client_id.contains_key(&request.client_order_id) {
            return Err(BrokerError::DuplicateClientOrderId {
                client_order_id: request.client_order_id,
            });
        }

        let order = OrderSnapshot {
            broker_order_id: BrokerOrderId::generate(),
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol,
            status: BrokerOrderStatus::Accepted,
            filled_qty: Decimal::ZERO,
            avg_fill_price: None,
        };
        state
            .ordered_qty
            .insert(order.broker_order_id.clone(), request.quantity);
        state
            .by_client_id
            .insert(request.client_order_id, order.broker_order_id.clone());
        state
            .orders
            .insert(order.broker_order_id.clone(), order.clone());

        tracing::debug!(
            broker_order_id = %order.broker_order_id,
            client_order_id = %order.client_order_id,
            symbol = %order.symbol,
            "Simulated order accepted"
        );
        Ok(order)
    }
}
