//! Lifecycle Integration Tests
//!
//! Drives a signal from registration to archival through the wired
//! container, against the simulated broker:
//! - register → submit entry order → fill → open position
//! - broker-side close detected by reconciliation (golden-source correction)
//! - archival to the JSON-lines cold store and retention delete
//! - stale `WAITING` signals expired by the sweep

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use signal_engine::application::ports::{Notification, NotificationError, NotificationSink};
use signal_engine::config::Config;
use signal_engine::domain::shared::{SignalId, StrategyId, Symbol, ThreadId};
use signal_engine::domain::signal_lifecycle::{
    AssetClass, CreateSignalCommand, PriceLevels, SignalRepository, SignalStatus, SignalStore,
};
use signal_engine::infrastructure::archive::JsonLinesColdStore;
use signal_engine::infrastructure::config::{Adapters, Container};
use signal_engine::infrastructure::persistence::InMemorySignalStore;
use signal_engine::{EntryFill, MismatchKind, SimulatedBroker};

// =============================================================================
// Harness
// =============================================================================

#[derive(Default)]
struct CollectingSink {
    delivered: Mutex<Vec<Notification>>,
}

impl CollectingSink {
    fn headlines(&self) -> Vec<String> {
        self.delivered
            .lock()
            .iter()
            .map(|n| n.headline.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for CollectingSink {
    fn name(&self) -> &'static str {
        "collecting"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.delivered.lock().push(notification.clone());
        Ok(())
    }
}

struct Harness {
    container: Container,
    broker: Arc<SimulatedBroker>,
    sink: Arc<CollectingSink>,
    cold_store: Arc<JsonLinesColdStore>,
    _dir: tempfile::TempDir,
}

fn harness_with_store(store: Arc<dyn SignalStore>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let broker = Arc::new(SimulatedBroker::new());
    let sink = Arc::new(CollectingSink::default());
    let cold_store = Arc::new(JsonLinesColdStore::new(dir.path().join("archive.jsonl")));

    let mut config = Config::default();
    config.notification.policy.retry_delay = std::time::Duration::from_millis(1);

    let container = Container::from_adapters(
        config,
        Adapters {
            broker: Arc::clone(&broker) as _,
            store,
            sink: Arc::clone(&sink) as _,
            cold_store: Arc::clone(&cold_store) as _,
        },
    );

    Harness {
        container,
        broker,
        sink,
        cold_store,
        _dir: dir,
    }
}

fn harness() -> Harness {
    harness_with_store(Arc::new(InMemorySignalStore::new()))
}

fn command(id: &str, symbol: &str, valid_for: Duration) -> CreateSignalCommand {
    CreateSignalCommand {
        id: SignalId::new(id),
        strategy_id: StrategyId::new("breakout-v2"),
        symbol: Symbol::new(symbol),
        asset_class: AssetClass::Equity,
        levels: PriceLevels::new(dec!(100), dec!(95), [dec!(105), dec!(110), dec!(120)]),
        valid_until: Utc::now() + valid_for,
        notification_thread: Some(ThreadId::new(format!("thread-{id}"))),
    }
}

/// Register, place and fill an entry, returning the signal id.
async fn open_trade(h: &Harness, id: &str, symbol: &str, quantity: Decimal) -> SignalId {
    let signal = h
        .container
        .register_signal()
        .execute(command(id, symbol, Duration::hours(4)))
        .await
        .unwrap();

    let submitted = h
        .container
        .submit_signal_order()
        .execute(signal.id(), quantity)
        .await
        .unwrap();
    let order_id = submitted.placement.order.broker_order_id.clone();
    assert!(h.broker.fill_order(&order_id, dec!(100.25)));

    h.container
        .open_position()
        .execute(EntryFill {
            signal_id: signal.id().clone(),
            fill_price: dec!(100.25),
            quantity,
            filled_at: Utc::now(),
        })
        .await
        .unwrap();

    signal.id().clone()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn entry_fill_opens_position_and_reconciles_clean() {
    let h = harness();
    let id = open_trade(&h, "sig-1", "AAPL", dec!(5)).await;

    let store = h.container.store();
    let signal = store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(signal.status(), SignalStatus::Active);
    assert!(signal.broker_order_id().is_some());
    assert_eq!(
        store.position_for(&id).await.unwrap().unwrap().quantity,
        dec!(5)
    );

    let report = h.container.reconcile().execute().await.unwrap();
    assert_eq!(report.positions_checked, 1);
    assert_eq!(report.total_mismatches(), 0);
    assert_eq!(report.outcome(), "clean");
}

#[tokio::test]
async fn broker_side_close_is_corrected_once() {
    let h = harness();
    let id = open_trade(&h, "sig-1", "AAPL", dec!(5)).await;
    h.broker.set_holding(Symbol::new("AAPL"), Decimal::ZERO);

    let report = h.container.reconcile().execute().await.unwrap();
    assert_eq!(report.mismatch_count(MismatchKind::OrphanPosition), 1);
    assert_eq!(report.corrections_committed, 1);

    let store = h.container.store();
    let signal = store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(signal.status(), SignalStatus::ClosedManual);
    assert!(store.position_for(&id).await.unwrap().is_none());

    let records = store.records_for_signal(&id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, MismatchKind::OrphanPosition);
    assert_eq!(records[0].store_quantity, dec!(5));
    assert_eq!(records[0].broker_quantity, Decimal::ZERO);

    // A second cycle finds nothing left to correct.
    let again = h.container.reconcile().execute().await.unwrap();
    assert_eq!(again.total_mismatches(), 0);
    assert_eq!(store.records(None).await.unwrap().len(), 1);

    h.container.drain_notifications().await;
    let headlines = h.sink.headlines();
    assert!(headlines.iter().any(|line| line.contains("orphan_position")));
}

#[tokio::test]
async fn partial_broker_close_syncs_quantity() {
    let h = harness();
    let id = open_trade(&h, "sig-1", "MSFT", dec!(10)).await;
    h.broker.set_holding(Symbol::new("MSFT"), dec!(4));

    let report = h.container.reconcile().execute().await.unwrap();
    assert_eq!(report.mismatch_count(MismatchKind::QuantityDrift), 1);

    let store = h.container.store();
    assert_eq!(
        store.position_for(&id).await.unwrap().unwrap().quantity,
        dec!(4)
    );
    assert_eq!(
        store.find_by_id(&id).await.unwrap().unwrap().status(),
        SignalStatus::Active
    );
}

#[tokio::test]
async fn closed_signal_is_archived_then_deleted() {
    let h = harness();
    let id = open_trade(&h, "sig-1", "AAPL", dec!(5)).await;
    h.broker.set_holding(Symbol::new("AAPL"), Decimal::ZERO);
    h.container.reconcile().execute().await.unwrap();

    let archive = h.container.archive_signals().unwrap();
    let now = Utc::now();

    let first = archive.execute(now).await.unwrap();
    assert_eq!(first.exported, 1);
    assert_eq!(first.deleted, 0);

    let entries = h.cold_store.read_all().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].signal.id(), &id);
    assert_eq!(entries[0].records.len(), 1);

    let later = archive.execute(now + Duration::days(8)).await.unwrap();
    assert_eq!(later.exported, 0);
    assert_eq!(later.deleted, 1);
    assert!(h.container.store().find_by_id(&id).await.unwrap().is_none());
    assert_eq!(h.cold_store.read_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn stale_waiting_signal_expires() {
    let h = harness();
    h.container
        .register_signal()
        .execute(command("sig-stale", "TSLA", Duration::minutes(30)))
        .await
        .unwrap();
    h.container
        .register_signal()
        .execute(command("sig-fresh", "NVDA", Duration::hours(8)))
        .await
        .unwrap();

    let report = h
        .container
        .expire_stale_signals()
        .execute(Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(report.expired, vec![SignalId::new("sig-stale")]);
    let store = h.container.store();
    assert_eq!(
        store
            .find_by_id(&SignalId::new("sig-stale"))
            .await
            .unwrap()
            .unwrap()
            .status(),
        SignalStatus::Expired
    );
    assert_eq!(
        store
            .find_by_id(&SignalId::new("sig-fresh"))
            .await
            .unwrap()
            .unwrap()
            .status(),
        SignalStatus::Waiting
    );
}

#[tokio::test]
async fn repeated_order_submission_places_one_order() {
    let h = harness();
    let signal = h
        .container
        .register_signal()
        .execute(command("sig-1", "AAPL", Duration::hours(4)))
        .await
        .unwrap();

    let submit = h.container.submit_signal_order();
    let first = submit.execute(signal.id(), dec!(5)).await.unwrap();
    let second = submit.execute(signal.id(), dec!(5)).await.unwrap();

    assert!(!first.placement.reused);
    assert!(second.placement.reused);
    assert_eq!(
        first.placement.order.broker_order_id,
        second.placement.order.broker_order_id
    );
    assert_eq!(h.broker.order_count(), 1);
}
