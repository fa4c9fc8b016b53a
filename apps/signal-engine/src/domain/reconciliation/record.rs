//! Reconciliation audit records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::{RecordId, SignalId, Symbol};

/// Kind of disagreement found between the store and the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// Store holds a position the broker does not.
    OrphanPosition,
    /// Store expects a broker order the broker does not know.
    OrphanOrder,
    /// Both sides hold the symbol with different quantities.
    QuantityDrift,
}

impl MismatchKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 3] = [Self::OrphanPosition, Self::OrphanOrder, Self::QuantityDrift];

    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OrphanPosition => "orphan_position",
            Self::OrphanOrder => "orphan_order",
            Self::QuantityDrift => "quantity_drift",
        }
    }
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MismatchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown mismatch kind: {s}"))
    }
}

/// Correction applied for a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectiveAction {
    /// Signal forced to `CLOSED_MANUAL` and its position deleted.
    ForcedClose,
    /// Stale broker order link removed from the signal.
    ClearedOrderLink,
    /// Stored quantity overwritten with the broker's.
    SyncedQuantity,
}

impl CorrectiveAction {
    /// The correction taken for each mismatch kind.
    #[must_use]
    pub const fn for_kind(kind: MismatchKind) -> Self {
        match kind {
            MismatchKind::OrphanPosition => Self::ForcedClose,
            MismatchKind::OrphanOrder => Self::ClearedOrderLink,
            MismatchKind::QuantityDrift => Self::SyncedQuantity,
        }
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ForcedClose => "forced_close",
            Self::ClearedOrderLink => "cleared_order_link",
            Self::SyncedQuantity => "synced_quantity",
        }
    }
}

impl fmt::Display for CorrectiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrectiveAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forced_close" => Ok(Self::ForcedClose),
            "cleared_order_link" => Ok(Self::ClearedOrderLink),
            "synced_quantity" => Ok(Self::SyncedQuantity),
            other => Err(format!("unknown corrective action: {other}")),
        }
    }
}

/// Append-only audit entry written by a reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    /// Record identifier.
    pub id: RecordId,
    /// Instrument the mismatch was found on.
    pub symbol: Symbol,
    /// Linked signal, if any.
    pub signal_id: Option<SignalId>,
    /// What disagreed.
    pub kind: MismatchKind,
    /// What was done about it.
    pub action: CorrectiveAction,
    /// Quantity the store held.
    pub store_quantity: Decimal,
    /// Quantity the broker reported.
    pub broker_quantity: Decimal,
    /// When the record was written.
    pub recorded_at: DateTime<Utc>,
}

impl ReconciliationRecord {
    /// Create a record for a detected mismatch.
    #[must_use]
    pub fn new(
        symbol: Symbol,
        signal_id: Option<SignalId>,
        kind: MismatchKind,
        store_quantity: Decimal,
        broker_quantity: Decimal,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::generate(),
            symbol,
            signal_id,
            kind,
            action: CorrectiveAction::for_kind(kind),
            store_quantity,
            broker_quantity,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn kind_roundtrips_through_storage_form() {
        for kind in MismatchKind::ALL {
            assert_eq!(kind.as_str().parse::<MismatchKind>(), Ok(kind));
        }
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&MismatchKind::OrphanPosition).unwrap();
        assert_eq!(json, "\"orphan_position\"");
    }

    #[test]
    fn record_action_follows_kind() {
        let record = ReconciliationRecord::new(
            Symbol::new("AAPL"),
            Some(SignalId::new("sig-1")),
            MismatchKind::OrphanPosition,
            dec!(5),
            Decimal::ZERO,
            Utc::now(),
        );
        assert_eq!(record.action, CorrectiveAction::ForcedClose);
    }
}
