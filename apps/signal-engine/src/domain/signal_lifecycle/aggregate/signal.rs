//! Signal Aggregate Root
//!
//! A trading opportunity emitted by a strategy. The status field can only be
//! changed through [`SignalStateMachine`](crate::domain::signal_lifecycle::services::SignalStateMachine).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::shared::{BrokerOrderId, SignalId, StrategyId, Symbol, ThreadId};
use crate::domain::signal_lifecycle::errors::SignalError;
use crate::domain::signal_lifecycle::value_objects::{AssetClass, PriceLevels, SignalStatus};

/// Command to create a new signal, as supplied by the strategy layer.
#[derive(Debug, Clone)]
pub struct CreateSignalCommand {
    /// Signal identifier assigned by the strategy layer.
    pub id: SignalId,
    /// Emitting strategy.
    pub strategy_id: StrategyId,
    /// Instrument.
    pub symbol: Symbol,
    /// Asset class of the instrument.
    pub asset_class: AssetClass,
    /// Entry, stop and take-profit levels.
    pub levels: PriceLevels,
    /// Deadline after which an unfilled signal expires.
    pub valid_until: DateTime<Utc>,
    /// Notification thread to report lifecycle changes into.
    pub notification_thread: Option<ThreadId>,
}

impl CreateSignalCommand {
    /// Validate the command parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignal` naming the first offending field.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), SignalError> {
        if self.id.as_str().trim().is_empty() {
            return Err(invalid("id", "signal id cannot be empty"));
        }
        if self.strategy_id.as_str().trim().is_empty() {
            return Err(invalid("strategy_id", "strategy id cannot be empty"));
        }
        if !self.symbol.is_valid() {
            return Err(invalid("symbol", "symbol is empty or malformed"));
        }
        if self.valid_until <= now {
            return Err(invalid("valid_until", "validity deadline is in the past"));
        }
        self.levels
            .validate()
            .map_err(|(field, message)| invalid(field, &message))?;
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> SignalError {
    SignalError::InvalidSignal {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Parameters for reconstituting a Signal from storage.
#[derive(Debug, Clone)]
pub struct ReconstitutedSignalParams {
    /// Signal identifier.
    pub id: SignalId,
    /// Emitting strategy.
    pub strategy_id: StrategyId,
    /// Instrument.
    pub symbol: Symbol,
    /// Asset class.
    pub asset_class: AssetClass,
    /// Stored status.
    pub status: SignalStatus,
    /// Price levels.
    pub levels: PriceLevels,
    /// Validity deadline.
    pub valid_until: DateTime<Utc>,
    /// Notification thread.
    pub notification_thread: Option<ThreadId>,
    /// Linked broker order.
    pub broker_order_id: Option<BrokerOrderId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// When the signal was exported to cold storage.
    pub archived_at: Option<DateTime<Utc>>,
    /// Stored version.
    pub version: u64,
}

/// Signal Aggregate Root.
///
/// Outside the crate a signal starts `WAITING` through [`Signal::new`]; stored
/// state is only rebuilt by the store adapters.
///
/// ```compile_fail
/// use signal_engine::domain::signal_lifecycle::ReconstitutedSignalParams;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    id: SignalId,
    strategy_id: StrategyId,
    symbol: Symbol,
    asset_class: AssetClass,
    status: SignalStatus,
    levels: PriceLevels,
    valid_until: DateTime<Utc>,
    notification_thread: Option<ThreadId>,
    broker_order_id: Option<BrokerOrderId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    archived_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Signal {
    /// Create a new `WAITING` signal from a command.
    ///
    /// # Errors
    ///
    /// Returns error if command validation fails.
    pub fn new(cmd: CreateSignalCommand, now: DateTime<Utc>) -> Result<Self, SignalError> {
        cmd.validate(now)?;

        Ok(Self {
            id: cmd.id,
            strategy_id: cmd.strategy_id,
            symbol: cmd.symbol,
            asset_class: cmd.asset_class,
            status: SignalStatus::Waiting,
            levels: cmd.levels,
            valid_until: cmd.valid_until,
            notification_thread: cmd.notification_thread,
            broker_order_id: None,
            created_at: now,
            updated_at: now,
            archived_at: None,
            version: 0,
        })
    }

    /// Rebuild a signal from persisted state.
    ///
    /// Skips command validation and accepts any status, so only store
    /// adapters call it.
    #[must_use]
    pub(crate) fn reconstitute(params: ReconstitutedSignalParams) -> Self {
        Self {
            id: params.id,
            strategy_id: params.strategy_id,
            symbol: params.symbol,
            asset_class: params.asset_class,
            status: params.status,
            levels: params.levels,
            valid_until: params.valid_until,
            notification_thread: params.notification_thread,
            broker_order_id: params.broker_order_id,
            created_at: params.created_at,
            updated_at: params.updated_at,
            archived_at: params.archived_at,
            version: params.version,
        }
    }

    /// Signal identifier.
    #[must_use]
    pub const fn id(&self) -> &SignalId {
        &self.id
    }

    /// Emitting strategy.
    #[must_use]
    pub const fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    /// Instrument.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Asset class.
    #[must_use]
    pub const fn asset_class(&self) -> AssetClass {
        self.asset_class
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> SignalStatus {
        self.status
    }

    /// Price levels.
    #[must_use]
    pub const fn levels(&self) -> &PriceLevels {
        &self.levels
    }

    /// Validity deadline.
    #[must_use]
    pub const fn valid_until(&self) -> DateTime<Utc> {
        self.valid_until
    }

    /// Notification thread, if any.
    #[must_use]
    pub const fn notification_thread(&self) -> Option<&ThreadId> {
        self.notification_thread.as_ref()
    }

    /// Linked broker order, if any.
    #[must_use]
    pub const fn broker_order_id(&self) -> Option<&BrokerOrderId> {
        self.broker_order_id.as_ref()
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// When the signal was exported to cold storage.
    #[must_use]
    pub const fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    /// Version the store holds for this signal.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns true if the signal can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns true if an unfilled signal has passed its deadline.
    #[must_use]
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SignalStatus::Waiting && self.valid_until <= now
    }

    /// Link the broker order placed for this signal.
    pub fn link_order(&mut self, order_id: BrokerOrderId, at: DateTime<Utc>) {
        self.broker_order_id = Some(order_id);
        self.updated_at = at;
    }

    /// Drop the link to a broker order that no longer exists.
    pub fn clear_order_link(&mut self, at: DateTime<Utc>) {
        self.broker_order_id = None;
        self.updated_at = at;
    }

    /// Record that the signal was exported to cold storage.
    pub const fn mark_archived(&mut self, at: DateTime<Utc>) {
        self.archived_at = Some(at);
    }

    /// Record that the store accepted a write of this signal.
    pub const fn advance_version(&mut self) {
        self.version += 1;
    }

    /// Restricted to the lifecycle module so only the state machine can move status.
    pub(in crate::domain::signal_lifecycle) const fn set_status(
        &mut self,
        status: SignalStatus,
        at: DateTime<Utc>,
    ) {
        self.status = status;
        self.updated_at = at;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    /// Build a valid `WAITING` signal for tests.
    pub fn waiting_signal(id: &str, symbol: &str) -> Signal {
        let now = Utc::now();
        Signal::new(
            CreateSignalCommand {
                id: SignalId::new(id),
                strategy_id: StrategyId::new("breakout-v2"),
                symbol: Symbol::new(symbol),
                asset_class: AssetClass::Equity,
                levels: PriceLevels::new(dec!(100), dec!(95), [dec!(105), dec!(110), dec!(120)]),
                valid_until: now + Duration::hours(4),
                notification_thread: Some(ThreadId::new("thread-1")),
            },
            now,
        )
        .unwrap()
    }

    /// Build a stored signal in an arbitrary status.
    pub fn signal_in(id: &str, symbol: &str, status: SignalStatus) -> Signal {
        let base = waiting_signal(id, symbol);
        Signal::reconstitute(ReconstitutedSignalParams {
            id: base.id().clone(),
            strategy_id: base.strategy_id().clone(),
            symbol: base.symbol().clone(),
            asset_class: base.asset_class(),
            status,
            levels: base.levels().clone(),
            valid_until: base.valid_until(),
            notification_thread: base.notification_thread().cloned(),
            broker_order_id: None,
            created_at: base.created_at(),
            updated_at: base.updated_at(),
            archived_at: None,
            version: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::waiting_signal;
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn command() -> CreateSignalCommand {
        CreateSignalCommand {
            id: SignalId::new("sig-1"),
            strategy_id: StrategyId::new("mean-reversion"),
            symbol: Symbol::new("aapl"),
            asset_class: AssetClass::Equity,
            levels: PriceLevels::new(dec!(100), dec!(95), [dec!(105), dec!(110), dec!(120)]),
            valid_until: Utc::now() + Duration::hours(1),
            notification_thread: None,
        }
    }

    #[test]
    fn new_signal_starts_waiting() {
        let signal = Signal::new(command(), Utc::now()).unwrap();
        assert_eq!(signal.status(), SignalStatus::Waiting);
        assert_eq!(signal.symbol().as_str(), "AAPL");
        assert_eq!(signal.version(), 0);
        assert!(signal.broker_order_id().is_none());
    }

    #[test]
    fn new_signal_rejects_past_deadline() {
        let mut cmd = command();
        cmd.valid_until = Utc::now() - Duration::minutes(1);
        let err = Signal::new(cmd, Utc::now()).unwrap_err();
        assert!(matches!(err, SignalError::InvalidSignal { ref field, .. } if field == "valid_until"));
    }

    #[test]
    fn new_signal_rejects_incoherent_levels() {
        let mut cmd = command();
        cmd.levels = PriceLevels::new(dec!(100), dec!(95), [dec!(99), dec!(110), dec!(120)]);
        let err = Signal::new(cmd, Utc::now()).unwrap_err();
        assert!(matches!(err, SignalError::InvalidSignal { ref field, .. } if field == "take_profit"));
    }

    #[test]
    fn new_signal_rejects_empty_strategy() {
        let mut cmd = command();
        cmd.strategy_id = StrategyId::new("  ");
        assert!(Signal::new(cmd, Utc::now()).is_err());
    }

    #[test]
    fn order_link_roundtrip() {
        let mut signal = waiting_signal("sig-2", "MSFT");
        let at = Utc::now();
        signal.link_order(BrokerOrderId::new("b-1"), at);
        assert_eq!(signal.broker_order_id().map(|id| id.as_str()), Some("b-1"));
        signal.clear_order_link(at);
        assert!(signal.broker_order_id().is_none());
    }

    #[test]
    fn stale_only_when_waiting_past_deadline() {
        let signal = waiting_signal("sig-3", "MSFT");
        assert!(!signal.is_stale_at(Utc::now()));
        assert!(signal.is_stale_at(signal.valid_until()));
    }
}
