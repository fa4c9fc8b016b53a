//! Alpaca API request and response types.
//!
//! These types map directly to Alpaca's REST API format.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::{BrokerOrderStatus, OrderSnapshot};
use crate::domain::shared::{BrokerOrderId, ClientOrderId, Symbol};

// ============================================================================
// Order Request Types
// ============================================================================

/// Order request for Alpaca API.
#[derive(Debug, Clone, Serialize)]
pub struct AlpacaOrderRequest {
    /// Stock symbol.
    pub symbol: String,
    /// Quantity (shares).
    pub qty: String,
    /// Order side.
    pub side: String,
    /// Order type.
    #[serde(rename = "type")]
    pub order_type: String,
    /// Time in force.
    pub time_in_force: String,
    /// Limit price (for limit orders).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<String>,
    /// Client order ID.
    pub client_order_id: String,
}

// ============================================================================
// Order Response Types
// ============================================================================

/// Order response from Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaOrderResponse {
    /// Broker order ID.
    pub id: String,
    /// Client order ID.
    pub client_order_id: String,
    /// Symbol.
    pub symbol: String,
    /// Filled quantity (as string).
    pub filled_qty: String,
    /// Average fill price (as string).
    #[serde(default)]
    pub filled_avg_price: Option<String>,
    /// Order status.
    pub status: String,
}

impl AlpacaOrderResponse {
    /// Convert to `OrderSnapshot`.
    #[must_use]
    pub fn to_snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            broker_order_id: BrokerOrderId::new(&self.id),
            client_order_id: ClientOrderId::new(&self.client_order_id),
            symbol: Symbol::new(&self.symbol),
            status: parse_order_status(&self.status),
            filled_qty: self.filled_qty.parse().unwrap_or(Decimal::ZERO),
            avg_fill_price: self.filled_avg_price.as_ref().and_then(|p| p.parse().ok()),
        }
    }
}

// ============================================================================
// Position Types
// ============================================================================

/// Position response from Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaPositionResponse {
    /// Symbol, without the pair separator for crypto.
    pub symbol: String,
    /// Signed quantity.
    pub qty: String,
}

// ============================================================================
// Error Types
// ============================================================================

/// Error response from Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaErrorResponse {
    /// Error code.
    #[serde(default)]
    pub code: Option<u64>,
    /// Error message.
    pub message: String,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse Alpaca order status string to `BrokerOrderStatus`.
fn parse_order_status(status: &str) -> BrokerOrderStatus {
    match status.to_lowercase().as_str() {
        "accepted" | "accepted_for_bidding" | "replaced" | "pending_replace" => {
            BrokerOrderStatus::Accepted
        }
        "partially_filled" => BrokerOrderStatus::PartiallyFilled,
        "filled" => BrokerOrderStatus::Filled,
        "done_for_day" | "expired" => BrokerOrderStatus::Expired,
        "canceled" | "pending_cancel" => BrokerOrderStatus::Canceled,
        "rejected" => BrokerOrderStatus::Rejected,
        // new, pending_new, stopped, suspended, calculated, and unknown -> New
        _ => BrokerOrderStatus::New,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_order_status_new() {
        assert_eq!(parse_order_status("new"), BrokerOrderStatus::New);
        assert_eq!(parse_order_status("pending_new"), BrokerOrderStatus::New);
    }

    #[test]
    fn parse_order_status_filled() {
        assert_eq!(parse_order_status("filled"), BrokerOrderStatus::Filled);
        assert_eq!(
            parse_order_status("partially_filled"),
            BrokerOrderStatus::PartiallyFilled
        );
    }

    #[test]
    fn parse_order_status_closed() {
        assert_eq!(parse_order_status("canceled"), BrokerOrderStatus::Canceled);
        assert_eq!(parse_order_status("expired"), BrokerOrderStatus::Expired);
        assert_eq!(parse_order_status("rejected"), BrokerOrderStatus::Rejected);
    }

    #[test]
    fn order_response_to_snapshot() {
        let json = r#"{
            "id": "broker-123",
            "client_order_id": "client-456",
            "symbol": "AAPL",
            "qty": "100",
            "filled_qty": "50",
            "filled_avg_price": "150.25",
            "status": "partially_filled",
            "side": "buy",
            "type": "limit"
        }"#;
        let response: AlpacaOrderResponse = serde_json::from_str(json).unwrap();

        let snapshot = response.to_snapshot();
        assert_eq!(snapshot.broker_order_id.as_str(), "broker-123");
        assert_eq!(snapshot.client_order_id.as_str(), "client-456");
        assert_eq!(snapshot.status, BrokerOrderStatus::PartiallyFilled);
        assert_eq!(snapshot.filled_qty, Decimal::new(50, 0));
        assert_eq!(snapshot.avg_fill_price, Some(Decimal::new(15025, 2)));
    }
}
