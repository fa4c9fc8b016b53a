//! Alpaca broker adapter implementing BrokerPort.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::application::ports::{
    BrokerError, BrokerPort, OrderSide, OrderSnapshot, OrderType, SubmitOrderRequest, TimeInForce,
};
use crate::domain::shared::{BrokerOrderId, ClientOrderId, Symbol};

use super::api_types::{AlpacaOrderRequest, AlpacaOrderResponse, AlpacaPositionResponse};
use super::config::{AlpacaConfig, AlpacaEnvironment};
use super::error::AlpacaError;
use super::http_client::AlpacaHttpClient;

/// Account positions keyed by [`Symbol::holdings_key`].
#[derive(Debug)]
struct PositionsSnapshot {
    fetched_at: Instant,
    by_key: Arc<HashMap<String, Decimal>>,
}

/// Alpaca Markets broker adapter.
///
/// Implements `BrokerPort` for the Alpaca Markets API.
#[derive(Debug, Clone)]
pub struct AlpacaBrokerAdapter {
    client: AlpacaHttpClient,
    environment: AlpacaEnvironment,
    positions_ttl: Duration,
    positions: Arc<Mutex<Option<PositionsSnapshot>>>,
}

impl AlpacaBrokerAdapter {
    /// Create a new Alpaca broker adapter.
    pub fn new(config: AlpacaConfig) -> Result<Self, AlpacaError> {
        let client = AlpacaHttpClient::new(&config)?;
        Ok(Self {
            client,
            environment: config.environment,
            positions_ttl: config.positions_ttl,
            positions: Arc::new(Mutex::new(None)),
        })
    }

    /// Check if we're in live trading mode.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.environment.is_live()
    }

    /// Convert `SubmitOrderRequest` to Alpaca API format.
    fn to_alpaca_order_request(request: &SubmitOrderRequest) -> AlpacaOrderRequest {
        let side = match request.side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        };

        let order_type = match request.order_type {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        };

        let time_in_force = match request.time_in_force {
            TimeInForce::Day => "day",
            TimeInForce::Gtc => "gtc",
        };

        AlpacaOrderRequest {
            symbol: request.symbol.as_str().to_string(),
            qty: request.quantity.to_string(),
            side: side.to_string(),
            order_type: order_type.to_string(),
            time_in_force: time_in_force.to_string(),
            limit_price: request.limit_price.map(|p| p.to_string()),
            client_order_id: request.client_order_id.as_str().to_string(),
        }
    }

    /// Account positions, reusing a response younger than `positions_ttl`.
    ///
    /// The lock is held across the request so concurrent batches share one
    /// fetch. Failed responses are not cached.
    async fn account_positions(&self) -> Result<Arc<HashMap<String, Decimal>>, BrokerError> {
        let mut cached = self.positions.lock().await;
        if let Some(snapshot) = cached.as_ref()
            && snapshot.fetched_at.elapsed() < self.positions_ttl
        {
            return Ok(Arc::clone(&snapshot.by_key));
        }

        let positions: Vec<AlpacaPositionResponse> = self
            .client
            .get("/v2/positions")
            .await
            .map_err(BrokerError::from)?;

        let mut by_key = HashMap::with_capacity(positions.len());
        for position in positions {
            let qty: Decimal = position.qty.parse().map_err(|_| BrokerError::Unknown {
                message: format!("Failed to parse quantity for {}", position.symbol),
            })?;
            by_key.insert(Symbol::new(&position.symbol).holdings_key(), qty);
        }
        let by_key = Arc::new(by_key);

        tracing::debug!(positions = by_key.len(), "Fetched Alpaca account positions");
        *cached = Some(PositionsSnapshot {
            fetched_at: Instant::now(),
            by_key: Arc::clone(&by_key),
        });
        Ok(by_key)
    }

    /// Treat a 404 as "no such order".
    fn optional(
        result: Result<AlpacaOrderResponse, AlpacaError>,
    ) -> Result<Option<OrderSnapshot>, BrokerError> {
        match result {
            Ok(response) => Ok(Some(response.to_snapshot())),
            Err(AlpacaError::NotFound { .. }) => Ok(None),
            Err(e) => Err(BrokerError::from(e)),
        }
    }
}

#[async_trait]
impl BrokerPort for AlpacaBrokerAdapter {
    async fn get_positions(
        &self,
        symbols: &[Symbol],
    ) -> Result<HashMap<Symbol, Decimal>, BrokerError> {
        // Alpaca has no symbol filter on this endpoint.
        let by_key = self.account_positions().await?;

        Ok(symbols
            .iter()
            .filter_map(|symbol| {
                by_key
                    .get(&symbol.holdings_key())
                    .map(|qty| (symbol.clone(), *qty))
            })
            .collect())
    }

    async fn get_order(
        &self,
        broker_order_id: &BrokerOrderId,
    ) -> Result<Option<OrderSnapshot>, BrokerError> {
        Self::optional(
            self.client
                .get(&format!("/v2/orders/{}", broker_order_id.as_str()))
                .await,
        )
    }

    async fn find_order_by_client_id(
        &self,
        client_order_id: &ClientOrderId,
    ) -> Result<Option<OrderSnapshot>, BrokerError> {
        Self::optional(
            self.client
                .get(&format!(
                    "/v2/orders:by_client_order_id?client_order_id={}",
                    client_order_id.as_str()
                ))
                .await,
        )
    }

    async fn submit_order(&self, request: SubmitOrderRequest) -> Result<OrderSnapshot, BrokerError> {
        if request.quantity <= Decimal::ZERO {
            return Err(AlpacaError::InvalidOrder(format!(
                "quantity must be positive, got {}",
                request.quantity
            ))
            .into());
        }

        if self.is_live() {
            tracing::warn!(
                client_order_id = %request.client_order_id,
                symbol = %request.symbol,
                "Submitting LIVE order - this will execute real trades"
            );
        }

        let alpaca_request = Self::to_alpaca_order_request(&request);

        tracing::info!(
            client_order_id = %request.client_order_id,
            symbol = %request.symbol,
            side = %alpaca_request.side,
            order_type = %alpaca_request.order_type,
            qty = %alpaca_request.qty,
            limit_price = ?alpaca_request.limit_price,
            "Submitting order to Alpaca"
        );

        let response: AlpacaOrderResponse = match self
            .client
            .post("/v2/orders", &alpaca_request)
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_duplicate_client_order_id() => {
                return Err(BrokerError::DuplicateClientOrderId {
                    client_order_id: request.client_order_id,
                });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            client_order_id = %request.client_order_id,
            broker_order_id = %response.id,
            status = %response.status,
            "Order submitted successfully"
        );

        Ok(response.to_snapshot())
    }
}
