//! Position entity.
//!
//! The stored view of a filled trade. A position references its signal but
//! does not own it, and only exists while that signal holds a position.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{PositionId, SignalId, Symbol};

/// An open trade linked to a signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Position identifier.
    pub id: PositionId,
    /// Signal that owns the trade intent.
    pub signal_id: SignalId,
    /// Instrument held.
    pub symbol: Symbol,
    /// Average entry fill price.
    pub entry_price: Decimal,
    /// Quantity the store believes is held.
    pub quantity: Decimal,
    /// Current stop-loss price.
    pub stop_loss: Decimal,
    /// When the entry filled.
    pub opened_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Create a position for a freshly filled entry.
    #[must_use]
    pub fn open(
        signal_id: SignalId,
        symbol: Symbol,
        entry_price: Decimal,
        quantity: Decimal,
        stop_loss: Decimal,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PositionId::generate(),
            signal_id,
            symbol,
            entry_price,
            quantity,
            stop_loss,
            opened_at: at,
            updated_at: at,
        }
    }

    /// Returns true if the store believes shares/units are held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    /// Overwrite the quantity with the broker's figure.
    pub fn sync_quantity(&mut self, quantity: Decimal, at: DateTime<Utc>) {
        self.quantity = quantity;
        self.updated_at = at;
    }
}
