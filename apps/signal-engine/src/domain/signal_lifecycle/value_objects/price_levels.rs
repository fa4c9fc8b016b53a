//! Entry, stop and take-profit levels of a signal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::SignalStatus;

/// Trade direction implied by the stop placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Stop below entry, targets above.
    Long,
    /// Stop above entry, targets below.
    Short,
}

/// Price levels attached to a signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevels {
    /// Entry price.
    pub entry: Decimal,
    /// Stop-loss price.
    pub stop_loss: Decimal,
    /// Take-profit tiers, nearest first.
    pub take_profit: [Decimal; 3],
}

impl PriceLevels {
    /// Create a new set of levels.
    #[must_use]
    pub const fn new(entry: Decimal, stop_loss: Decimal, take_profit: [Decimal; 3]) -> Self {
        Self {
            entry,
            stop_loss,
            take_profit,
        }
    }

    /// Direction implied by the stop relative to the entry.
    #[must_use]
    pub fn direction(&self) -> Direction {
        if self.stop_loss < self.entry {
            Direction::Long
        } else {
            Direction::Short
        }
    }

    /// Target price for a take-profit status.
    #[must_use]
    pub const fn target_for(&self, status: SignalStatus) -> Option<Decimal> {
        match status {
            SignalStatus::Tp1Hit => Some(self.take_profit[0]),
            SignalStatus::Tp2Hit => Some(self.take_profit[1]),
            SignalStatus::Tp3Hit => Some(self.take_profit[2]),
            _ => None,
        }
    }

    /// Check the levels describe a coherent trade.
    ///
    /// Returns the first problem found, as `(field, message)`.
    pub fn validate(&self) -> Result<(), (&'static str, String)> {
        if self.entry <= Decimal::ZERO {
            return Err(("entry", "entry price must be positive".to_string()));
        }
        if self.stop_loss <= Decimal::ZERO {
            return Err(("stop_loss", "stop price must be positive".to_string()));
        }
        if self.stop_loss == self.entry {
            return Err((
                "stop_loss",
                "stop price must differ from entry".to_string(),
            ));
        }

        let direction = self.direction();
        let mut previous = self.entry;
        for (i, target) in self.take_profit.iter().enumerate() {
            let forward = match direction {
                Direction::Long => *target > previous,
                Direction::Short => *target < previous && *target > Decimal::ZERO,
            };
            if !forward {
                return Err((
                    "take_profit",
                    format!(
                        "TP{} ({target}) must lie beyond {previous} for a {direction:?} trade",
                        i + 1
                    ),
                ));
            }
            previous = *target;
        }

        Ok(())
    }
}
