//! Notification Sink Port (Driven Port)
//!
//! Interface for delivering human-facing messages about signal changes.
//! Delivery is best-effort: callers never roll back state because of it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::reconciliation::ReconciliationRecord;
use crate::domain::shared::{SignalId, Symbol, ThreadId};
use crate::domain::signal_lifecycle::{Signal, SignalStatus};

/// A message for the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Signal the message is about, if any.
    pub signal_id: Option<SignalId>,
    /// Instrument.
    pub symbol: Symbol,
    /// Thread to post into, if the signal has one.
    pub thread_id: Option<ThreadId>,
    /// Status the signal is now in, if it changed.
    pub status: Option<SignalStatus>,
    /// One-line summary.
    pub headline: String,
    /// Longer body.
    pub detail: String,
    /// When the underlying change was committed.
    pub occurred_at: DateTime<Utc>,
}

impl Notification {
    /// Message for a committed status change.
    #[must_use]
    pub fn status_changed(signal: &Signal, from: SignalStatus, at: DateTime<Utc>) -> Self {
        Self {
            signal_id: Some(signal.id().clone()),
            symbol: signal.symbol().clone(),
            thread_id: signal.notification_thread().cloned(),
            status: Some(signal.status()),
            headline: format!("{} {}", signal.symbol(), signal.status()),
            detail: format!(
                "Signal {} moved {} -> {} (strategy {})",
                signal.id(),
                from,
                signal.status(),
                signal.strategy_id()
            ),
            occurred_at: at,
        }
    }

    /// Message for a committed reconciliation correction.
    #[must_use]
    pub fn reconciliation(record: &ReconciliationRecord, signal: Option<&Signal>) -> Self {
        Self {
            signal_id: record.signal_id.clone(),
            symbol: record.symbol.clone(),
            thread_id: signal.and_then(|s| s.notification_thread().cloned()),
            status: signal.map(Signal::status),
            headline: format!("{} reconciliation: {}", record.symbol, record.kind),
            detail: format!(
                "Store held {}, broker reported {}; action {}",
                record.store_quantity, record.broker_quantity, record.action
            ),
            occurred_at: record.recorded_at,
        }
    }

    /// Message for a newly registered signal.
    #[must_use]
    pub fn registered(signal: &Signal) -> Self {
        let levels = signal.levels();
        Self {
            signal_id: Some(signal.id().clone()),
            symbol: signal.symbol().clone(),
            thread_id: signal.notification_thread().cloned(),
            status: Some(signal.status()),
            headline: format!("New {} signal on {}", signal.asset_class(), signal.symbol()),
            detail: format!(
                "Entry {} stop {} targets {} / {} / {}",
                levels.entry,
                levels.stop_loss,
                levels.take_profit[0],
                levels.take_profit[1],
                levels.take_profit[2]
            ),
            occurred_at: signal.created_at(),
        }
    }
}

/// Notification delivery error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    /// Sink could not be reached.
    #[error("Notification delivery failed: {message}")]
    DeliveryFailed {
        /// Error details.
        message: String,
    },

    /// Sink answered with an error status.
    #[error("Notification rejected with status {status}")]
    Rejected {
        /// HTTP status or sink-specific code.
        status: u16,
    },

    /// A single attempt exceeded its timeout.
    #[error("Notification attempt timed out")]
    Timeout,
}

/// Port for delivering notifications.
///
/// Deliveries run on detached tasks, so sinks must be `'static`.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Sink name for logs.
    fn name(&self) -> &'static str;

    /// Deliver a single notification.
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reconciliation::MismatchKind;
    use crate::domain::signal_lifecycle::aggregate::test_support::signal_in;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn status_change_carries_thread() {
        let signal = signal_in("sig-1", "AAPL", SignalStatus::Tp1Hit);
        let note = Notification::status_changed(&signal, SignalStatus::Active, Utc::now());
        assert_eq!(note.thread_id.as_ref().map(|t| t.as_str()), Some("thread-1"));
        assert!(note.detail.contains("ACTIVE -> TP1_HIT"));
    }

    #[test]
    fn reconciliation_message_names_kind() {
        let signal = signal_in("sig-1", "AAPL", SignalStatus::ClosedManual);
        let record = ReconciliationRecord::new(
            signal.symbol().clone(),
            Some(signal.id().clone()),
            MismatchKind::OrphanPosition,
            dec!(5),
            Decimal::ZERO,
            Utc::now(),
        );
        let note = Notification::reconciliation(&record, Some(&signal));
        assert!(note.headline.contains("orphan_position"));
        assert_eq!(note.status, Some(SignalStatus::ClosedManual));
    }
}
