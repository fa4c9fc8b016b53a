//! Signal status in the lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a trading signal.
///
/// Intended progression:
///
/// ```text
/// WAITING → ACTIVE → TP1_HIT → TP2_HIT → TP3_HIT
/// ```
///
/// with `STOP_LOSS_HIT`, `CLOSED_MANUAL` and `EXPIRED` as side exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    /// Emitted by a strategy, entry not yet filled.
    Waiting,
    /// Entry filled, position open.
    Active,
    /// First take-profit target reached.
    #[serde(rename = "TP1_HIT")]
    Tp1Hit,
    /// Second take-profit target reached.
    #[serde(rename = "TP2_HIT")]
    Tp2Hit,
    /// Final take-profit target reached.
    #[serde(rename = "TP3_HIT")]
    Tp3Hit,
    /// Stop loss triggered.
    StopLossHit,
    /// Closed outside the strategy (operator action or broker-side close).
    ClosedManual,
    /// Validity deadline passed before entry.
    Expired,
}

impl SignalStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Waiting,
        Self::Active,
        Self::Tp1Hit,
        Self::Tp2Hit,
        Self::Tp3Hit,
        Self::StopLossHit,
        Self::ClosedManual,
        Self::Expired,
    ];

    /// Statuses from which further transitions are possible.
    pub const NON_TERMINAL: [Self; 4] = [Self::Waiting, Self::Active, Self::Tp1Hit, Self::Tp2Hit];

    /// Statuses from which no transition is permitted.
    pub const TERMINAL: [Self; 4] = [
        Self::Tp3Hit,
        Self::StopLossHit,
        Self::ClosedManual,
        Self::Expired,
    ];

    /// Returns true if no further transition is permitted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Tp3Hit | Self::StopLossHit | Self::ClosedManual | Self::Expired
        )
    }

    /// Returns true if the entry has filled and the trade is still open.
    ///
    /// Only these statuses may own a stored position.
    #[must_use]
    pub const fn holds_position(&self) -> bool {
        matches!(self, Self::Active | Self::Tp1Hit | Self::Tp2Hit)
    }

    /// Position on the main progression chain, if the status is on it.
    ///
    /// Side exits have no tier.
    #[must_use]
    pub const fn tier(&self) -> Option<u8> {
        match self {
            Self::Waiting => Some(0),
            Self::Active => Some(1),
            Self::Tp1Hit => Some(2),
            Self::Tp2Hit => Some(3),
            Self::Tp3Hit => Some(4),
            Self::StopLossHit | Self::ClosedManual | Self::Expired => None,
        }
    }

    /// Wire/storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Active => "ACTIVE",
            Self::Tp1Hit => "TP1_HIT",
            Self::Tp2Hit => "TP2_HIT",
            Self::Tp3Hit => "TP3_HIT",
            Self::StopLossHit => "STOP_LOSS_HIT",
            Self::ClosedManual => "CLOSED_MANUAL",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for SignalStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
