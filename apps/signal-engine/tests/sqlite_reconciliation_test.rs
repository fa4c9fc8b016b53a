//! SQLite Reconciliation Tests
//!
//! Runs scheduler ticks against the SQLite store and checks that corrections
//! are durable across a reconnect.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use signal_engine::config::Config;
use signal_engine::domain::shared::{SignalId, StrategyId, Symbol};
use signal_engine::domain::signal_lifecycle::{
    AssetClass, CreateSignalCommand, PriceLevels, SignalRepository, SignalStatus,
};
use signal_engine::infrastructure::archive::JsonLinesColdStore;
use signal_engine::infrastructure::config::{Adapters, Container};
use signal_engine::infrastructure::notification::LogSink;
use signal_engine::{EntryFill, MismatchKind, SimulatedBroker, SqliteSignalStore};

fn command(id: &str, symbol: &str) -> CreateSignalCommand {
    CreateSignalCommand {
        id: SignalId::new(id),
        strategy_id: StrategyId::new("mean-revert"),
        symbol: Symbol::new(symbol),
        asset_class: AssetClass::Equity,
        levels: PriceLevels::new(dec!(50), dec!(48), [dec!(52), dec!(54), dec!(58)]),
        valid_until: Utc::now() + Duration::hours(6),
        notification_thread: None,
    }
}

async fn container(
    db_url: &str,
    broker: &Arc<SimulatedBroker>,
    dir: &tempfile::TempDir,
) -> Container {
    let store = Arc::new(SqliteSignalStore::connect(db_url).await.unwrap());
    let mut config = Config::default();
    config.reconciliation.expiry_enabled = false;
    Container::from_adapters(
        config,
        Adapters {
            broker: Arc::clone(broker) as _,
            store,
            sink: Arc::new(LogSink::new()),
            cold_store: Arc::new(JsonLinesColdStore::new(dir.path().join("archive.jsonl"))),
        },
    )
}

#[tokio::test]
async fn tick_corrects_store_and_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite://{}", dir.path().join("signals.db").display());
    let broker = Arc::new(SimulatedBroker::new());
    let engine = container(&db_url, &broker, &dir).await;

    // Filled entry the broker later closed on its own.
    let closed = engine
        .register_signal()
        .execute(command("sig-closed", "AMD"))
        .await
        .unwrap();
    let placed = engine
        .submit_signal_order()
        .execute(closed.id(), dec!(20))
        .await
        .unwrap();
    assert!(broker.fill_order(&placed.placement.order.broker_order_id, dec!(50.10)));
    engine
        .open_position()
        .execute(EntryFill {
            signal_id: closed.id().clone(),
            fill_price: dec!(50.10),
            quantity: dec!(20),
            filled_at: Utc::now(),
        })
        .await
        .unwrap();
    broker.set_holding(Symbol::new("AMD"), Decimal::ZERO);

    // Pending entry whose order the broker no longer knows.
    let pending = engine
        .register_signal()
        .execute(command("sig-pending", "INTC"))
        .await
        .unwrap();
    let lost = engine
        .submit_signal_order()
        .execute(pending.id(), dec!(10))
        .await
        .unwrap();
    broker.forget_order(&lost.placement.order.broker_order_id);

    let summary = engine.scheduler().tick(&CancellationToken::new()).await;

    let cycle = summary.cycle.unwrap();
    assert_eq!(cycle.mismatch_count(MismatchKind::OrphanPosition), 1);
    assert_eq!(cycle.mismatch_count(MismatchKind::OrphanOrder), 1);
    assert_eq!(cycle.corrections_committed, 2);
    assert!(cycle.failures.is_empty());
    assert!(summary.expiry.is_none());
    assert_eq!(summary.archive.unwrap().exported, 1);

    drop(engine);
    let reopened = SqliteSignalStore::connect(&db_url).await.unwrap();

    let closed = reopened.find_by_id(closed.id()).await.unwrap().unwrap();
    assert_eq!(closed.status(), SignalStatus::ClosedManual);
    assert!(closed.archived_at().is_some());
    assert!(reopened.position_for(closed.id()).await.unwrap().is_none());

    let pending = reopened.find_by_id(pending.id()).await.unwrap().unwrap();
    assert_eq!(pending.status(), SignalStatus::Waiting);
    assert!(pending.broker_order_id().is_none());

    let records = reopened.records(None).await.unwrap();
    assert_eq!(records.len(), 2);
    let kinds: Vec<MismatchKind> = records.iter().map(|r| r.kind).collect();
    assert!(kinds.contains(&MismatchKind::OrphanPosition));
    assert!(kinds.contains(&MismatchKind::OrphanOrder));
}

#[tokio::test]
async fn clean_tick_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite://{}", dir.path().join("signals.db").display());
    let broker = Arc::new(SimulatedBroker::new());
    let engine = container(&db_url, &broker, &dir).await;

    let signal = engine
        .register_signal()
        .execute(command("sig-1", "AMD"))
        .await
        .unwrap();
    let placed = engine
        .submit_signal_order()
        .execute(signal.id(), dec!(3))
        .await
        .unwrap();
    broker.fill_order(&placed.placement.order.broker_order_id, dec!(50));
    engine
        .open_position()
        .execute(EntryFill {
            signal_id: signal.id().clone(),
            fill_price: dec!(50),
            quantity: dec!(3),
            filled_at: Utc::now(),
        })
        .await
        .unwrap();

    let before = engine.store().find_by_id(signal.id()).await.unwrap().unwrap();
    let summary = engine.scheduler().tick(&CancellationToken::new()).await;

    assert_eq!(summary.cycle.unwrap().outcome(), "clean");
    assert_eq!(summary.archive.unwrap().exported, 0);
    let after = engine.store().find_by_id(signal.id()).await.unwrap().unwrap();
    assert_eq!(after.version(), before.version());
    assert!(engine.store().records(None).await.unwrap().is_empty());
}
