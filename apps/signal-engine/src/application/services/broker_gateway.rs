//! Broker Gateway
//!
//! Wraps a [`BrokerPort`] with the policies every caller needs: holdings are
//! always fetched in batches, rate-limit responses are retried using the
//! server's hint (a hint above `max_retry_after` fails the call instead), each
//! call carries a timeout, and order placement is
//! idempotent on a key derived from the signal.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::backoff::{ExponentialBackoff, RetryPolicy, duration_ms};
use crate::application::ports::{
    BrokerError, BrokerPort, OrderSide, OrderSnapshot, SubmitOrderRequest,
};
use crate::domain::shared::{BrokerOrderId, ClientOrderId, SignalId, Symbol};
use crate::telemetry;

/// Configuration for the broker gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Maximum symbols per holdings request.
    pub batch_size: usize,
    /// Timeout for a single broker call.
    #[serde(with = "duration_ms")]
    pub call_timeout: Duration,
    /// Retry policy for rate-limited calls. `max_attempts` caps the total calls.
    pub rate_limit: RetryPolicy,
    /// Longest server backoff hint the gateway will wait out. A longer hint
    /// fails the call without retrying.
    #[serde(with = "duration_ms")]
    pub max_retry_after: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            call_timeout: Duration::from_secs(10),
            rate_limit: RetryPolicy::default(),
            max_retry_after: Duration::from_secs(60),
        }
    }
}

/// Errors from the broker gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The broker kept rate limiting until the retry budget ran out.
    #[error("Rate limit exceeded for {operation} after {attempts} attempts")]
    RateLimitExceeded {
        /// Broker operation.
        operation: &'static str,
        /// Calls made.
        attempts: u32,
    },

    /// A broker call did not complete in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Broker operation.
        operation: &'static str,
        /// Timeout applied.
        after: Duration,
    },

    /// Any other broker failure.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Why an order is being placed. Part of the idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPurpose {
    /// Opening order for a signal.
    Entry,
    /// Closing order for a signal's position.
    Exit,
}

impl OrderPurpose {
    /// Stable string used in the idempotency key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
        }
    }
}

/// An order the engine wants to exist at the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIntent {
    /// Signal the order belongs to.
    pub signal_id: SignalId,
    /// Entry or exit.
    pub purpose: OrderPurpose,
    /// Instrument.
    pub symbol: Symbol,
    /// Side.
    pub side: OrderSide,
    /// Quantity.
    pub quantity: Decimal,
    /// Limit price; market order if absent.
    pub limit_price: Option<Decimal>,
}

impl OrderIntent {
    /// Deterministic idempotency key for this intent.
    #[must_use]
    pub fn client_order_id(&self) -> ClientOrderId {
        ClientOrderId::derive(&self.signal_id, self.purpose.as_str())
    }

    fn to_request(&self, client_order_id: ClientOrderId) -> SubmitOrderRequest {
        match self.limit_price {
            Some(price) => SubmitOrderRequest::limit(
                client_order_id,
                self.symbol.clone(),
                self.side,
                self.quantity,
                price,
            ),
            None => SubmitOrderRequest::market(
                client_order_id,
                self.symbol.clone(),
                self.side,
                self.quantity,
            ),
        }
    }
}

/// Result of placing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// The broker's order.
    pub order: OrderSnapshot,
    /// True if the order already existed and no new one was submitted.
    pub reused: bool,
}

/// Result of looking up an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLookup {
    /// The broker knows the order.
    Found(OrderSnapshot),
    /// The broker has no such order.
    NotFound,
}

/// A holdings batch that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Symbols in the failed batch.
    pub symbols: Vec<Symbol>,
    /// Why it failed.
    pub error: GatewayError,
}

/// Holdings for the requested symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoldingsReport {
    /// Quantity held per symbol. Every symbol of a successful batch is present.
    pub quantities: HashMap<Symbol, Decimal>,
    /// Batches that failed.
    pub failed: Vec<BatchFailure>,
}

impl HoldingsReport {
    /// Quantity held, or `None` if the symbol's batch failed.
    #[must_use]
    pub fn quantity(&self, symbol: &Symbol) -> Option<Decimal> {
        self.quantities.get(symbol).copied()
    }

    /// Returns true if the symbol's batch failed.
    #[must_use]
    pub fn is_failed(&self, symbol: &Symbol) -> bool {
        self.failed.iter().any(|f| f.symbols.contains(symbol))
    }

    /// All symbols whose batch failed.
    #[must_use]
    pub fn failed_symbols(&self) -> Vec<Symbol> {
        self.failed
            .iter()
            .flat_map(|f| f.symbols.iter().cloned())
            .collect()
    }
}

/// Broker gateway.
pub struct BrokerGateway<B>
where
    B: BrokerPort + ?Sized,
{
    broker: Arc<B>,
    config: GatewayConfig,
}

impl<B> BrokerGateway<B>
where
    B: BrokerPort + ?Sized,
{
    /// Create a new gateway.
    pub const fn new(broker: Arc<B>, config: GatewayConfig) -> Self {
        Self { broker, config }
    }

    /// Gateway configuration.
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Fetch holdings for `symbols` in batches of `batch_size`.
    ///
    /// A symbol missing from a successful batch response is reported as zero.
    /// A failed batch is recorded in the report; other batches still succeed.
    pub async fn fetch_holdings(&self, symbols: &[Symbol]) -> HoldingsReport {
        let unique: Vec<Symbol> = symbols
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut report = HoldingsReport::default();

        for chunk in unique.chunks(self.config.batch_size.max(1)) {
            let broker = &self.broker;
            let result = self
                .call("get_positions", move || broker.get_positions(chunk))
                .await;

            match result {
                Ok(held) => {
                    for symbol in chunk {
                        let qty = held.get(symbol).copied().unwrap_or(Decimal::ZERO);
                        report.quantities.insert(symbol.clone(), qty.abs());
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        batch_size = chunk.len(),
                        first_symbol = %chunk[0],
                        error = %error,
                        "Holdings batch failed, skipping its symbols this cycle"
                    );
                    report.failed.push(BatchFailure {
                        symbols: chunk.to_vec(),
                        error,
                    });
                }
            }
        }

        report
    }

    /// Look up an order. An unknown order is a normal outcome.
    ///
    /// # Errors
    ///
    /// Returns error if the broker cannot be queried.
    pub async fn fetch_order_status(
        &self,
        order_id: &BrokerOrderId,
    ) -> Result<OrderLookup, GatewayError> {
        let broker = &self.broker;
        let found = self
            .call("get_order", move || broker.get_order(order_id))
            .await?;

        Ok(found.map_or(OrderLookup::NotFound, OrderLookup::Found))
    }

    /// Place an order at most once per intent.
    ///
    /// Looks for an existing order with the derived client order ID first, and
    /// treats a duplicate-ID rejection as that existing order.
    ///
    /// # Errors
    ///
    /// Returns error if the broker rejects or cannot be reached.
    pub async fn place_order(&self, intent: &OrderIntent) -> Result<Placement, GatewayError> {
        let client_order_id = intent.client_order_id();

        if let Some(order) = self.find_by_client_id(&client_order_id).await? {
            tracing::info!(
                signal_id = %intent.signal_id,
                client_order_id = %client_order_id,
                broker_order_id = %order.broker_order_id,
                "Order already exists at broker, reusing"
            );
            return Ok(Placement {
                order,
                reused: true,
            });
        }

        let request = intent.to_request(client_order_id.clone());
        let broker = &self.broker;
        let submitted = self
            .call("submit_order", move || broker.submit_order(request.clone()))
            .await;

        match submitted {
            Ok(order) => {
                tracing::info!(
                    signal_id = %intent.signal_id,
                    client_order_id = %client_order_id,
                    broker_order_id = %order.broker_order_id,
                    status = %order.status,
                    "Order placed"
                );
                Ok(Placement {
                    order,
                    reused: false,
                })
            }
            Err(GatewayError::Broker(BrokerError::DuplicateClientOrderId { .. })) => {
                let order = self.find_by_client_id(&client_order_id).await?.ok_or_else(|| {
                    GatewayError::Broker(BrokerError::Unknown {
                        message: format!(
                            "broker reported duplicate client order id {client_order_id} but has no such order"
                        ),
                    })
                })?;
                tracing::info!(
                    signal_id = %intent.signal_id,
                    client_order_id = %client_order_id,
                    "Duplicate submission resolved to existing order"
                );
                Ok(Placement {
                    order,
                    reused: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn find_by_client_id(
        &self,
        client_order_id: &ClientOrderId,
    ) -> Result<Option<OrderSnapshot>, GatewayError> {
        let broker = &self.broker;
        self.call("find_order_by_client_id", move || {
            broker.find_order_by_client_id(client_order_id)
        })
        .await
    }

    /// Run a broker call with a timeout, retrying while rate limited.
    async fn call<T, F, Fut>(&self, operation: &'static str, mut f: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, BrokerError>> + Send,
    {
        let mut backoff = ExponentialBackoff::new(&self.config.rate_limit);

        loop {
            let result = tokio::time::timeout(self.config.call_timeout, f())
                .await
                .map_err(|_| GatewayError::Timeout {
                    operation,
                    after: self.config.call_timeout,
                })?;

            match result {
                Ok(value) => return Ok(value),
                Err(BrokerError::RateLimited { retry_after }) => {
                    if let Some(hint) = retry_after
                        && hint > self.config.max_retry_after
                    {
                        tracing::warn!(
                            operation,
                            retry_after_ms = hint.as_millis() as u64,
                            max_retry_after_ms = self.config.max_retry_after.as_millis() as u64,
                            "Rate limit hint exceeds the allowed wait, giving up"
                        );
                        telemetry::record_rate_limit_exhausted(operation);
                        return Err(GatewayError::RateLimitExceeded {
                            operation,
                            attempts: backoff.attempt() + 1,
                        });
                    }
                    let Some(fallback) = backoff.next_backoff() else {
                        telemetry::record_rate_limit_exhausted(operation);
                        return Err(GatewayError::RateLimitExceeded {
                            operation,
                            attempts: backoff.attempt(),
                        });
                    };
                    let delay = retry_after.unwrap_or(fallback);
                    tracing::warn!(
                        operation,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        hinted = retry_after.is_some(),
                        "Rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(GatewayError::Broker(e)),
            }
        }
    }
}
