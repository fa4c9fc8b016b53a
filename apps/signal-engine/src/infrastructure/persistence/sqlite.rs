//! SQLite operational store.
//!
//! Every batch runs inside one transaction. Version checks, referential checks
//! and the position invariant are evaluated inside that transaction, and any
//! failure drops it, which rolls the whole batch back.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Sqlite, Transaction};

use crate::domain::reconciliation::{CorrectiveAction, MismatchKind, ReconciliationRecord};
use crate::domain::shared::{
    BrokerOrderId, PositionId, RecordId, SignalId, StrategyId, Symbol, ThreadId,
};
use crate::domain::signal_lifecycle::{
    AssetClass, CommitReceipt, PersistenceError, Position, PriceLevels,
    ReconstitutedSignalParams, Signal, SignalRepository, SignalStatus, UnitOfWork, WriteOp,
};

const SCHEMA: &str = include_str!("schema.sql");

const SIGNAL_COLUMNS: &str = "id, strategy_id, symbol, asset_class, status, entry_price, \
     stop_loss, take_profit_1, take_profit_2, take_profit_3, valid_until, notification_thread, \
     broker_order_id, created_at, updated_at, archived_at, version";

const POSITION_COLUMNS: &str =
    "signal_id, id, symbol, entry_price, quantity, stop_loss, opened_at, updated_at";

const RECORD_COLUMNS: &str =
    "id, symbol, signal_id, kind, action, store_quantity, broker_quantity, recorded_at";

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

fn corrupt(column: &str, value: &str) -> PersistenceError {
    PersistenceError::Storage(format!("unreadable {column} value {value:?}"))
}

fn decimal(column: &str, value: &str) -> Result<Decimal, PersistenceError> {
    Decimal::from_str(value).map_err(|_| corrupt(column, value))
}

#[derive(Debug, FromRow)]
struct SignalRow {
    id: String,
    strategy_id: String,
    symbol: String,
    asset_class: String,
    status: String,
    entry_price: String,
    stop_loss: String,
    take_profit_1: String,
    take_profit_2: String,
    take_profit_3: String,
    valid_until: DateTime<Utc>,
    notification_thread: Option<String>,
    broker_order_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    archived_at: Option<DateTime<Utc>>,
    version: i64,
}

impl TryFrom<SignalRow> for Signal {
    type Error = PersistenceError;

    fn try_from(row: SignalRow) -> Result<Self, Self::Error> {
        let asset_class = AssetClass::from_str(&row.asset_class)
            .map_err(|_| corrupt("asset_class", &row.asset_class))?;
        let status =
            SignalStatus::from_str(&row.status).map_err(|e| corrupt("status", &e.0))?;
        let levels = PriceLevels::new(
            decimal("entry_price", &row.entry_price)?,
            decimal("stop_loss", &row.stop_loss)?,
            [
                decimal("take_profit_1", &row.take_profit_1)?,
                decimal("take_profit_2", &row.take_profit_2)?,
                decimal("take_profit_3", &row.take_profit_3)?,
            ],
        );
        let version =
            u64::try_from(row.version).map_err(|_| corrupt("version", &row.version.to_string()))?;

        Ok(Self::reconstitute(ReconstitutedSignalParams {
            id: SignalId::new(row.id),
            strategy_id: StrategyId::new(row.strategy_id),
            symbol: Symbol::new(row.symbol),
            asset_class,
            status,
            levels,
            valid_until: row.valid_until,
            notification_thread: row.notification_thread.map(ThreadId::new),
            broker_order_id: row.broker_order_id.map(BrokerOrderId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
            archived_at: row.archived_at,
            version,
        }))
    }
}

#[derive(Debug, FromRow)]
struct PositionRow {
    signal_id: String,
    id: String,
    symbol: String,
    entry_price: String,
    quantity: String,
    stop_loss: String,
    opened_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PositionRow> for Position {
    type Error = PersistenceError;

    fn try_from(row: PositionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PositionId::new(row.id),
            signal_id: SignalId::new(row.signal_id),
            symbol: Symbol::new(row.symbol),
            entry_price: decimal("entry_price", &row.entry_price)?,
            quantity: decimal("quantity", &row.quantity)?,
            stop_loss: decimal("stop_loss", &row.stop_loss)?,
            opened_at: row.opened_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RecordRow {
    id: String,
    symbol: String,
    signal_id: Option<String>,
    kind: String,
    action: String,
    store_quantity: String,
    broker_quantity: String,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for ReconciliationRecord {
    type Error = PersistenceError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RecordId::new(row.id),
            symbol: Symbol::new(row.symbol),
            signal_id: row.signal_id.map(SignalId::new),
            kind: MismatchKind::from_str(&row.kind).map_err(|_| corrupt("kind", &row.kind))?,
            action: CorrectiveAction::from_str(&row.action)
                .map_err(|_| corrupt("action", &row.action))?,
            store_quantity: decimal("store_quantity", &row.store_quantity)?,
            broker_quantity: decimal("broker_quantity", &row.broker_quantity)?,
            recorded_at: row.recorded_at,
        })
    }
}

fn version_param(version: u64) -> Result<i64, PersistenceError> {
    i64::try_from(version)
        .map_err(|_| PersistenceError::Storage(format!("version {version} out of range")))
}

fn duplicate_or(err: sqlx::Error, what: String) -> PersistenceError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => PersistenceError::Duplicate(what),
        _ => err.into(),
    }
}

/// SQLite-backed operational store.
#[derive(Debug, Clone)]
pub struct SqliteSignalStore {
    pool: SqlitePool,
}

impl SqliteSignalStore {
    /// Open (creating if needed) the database at `url` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the database cannot be opened or migrated.
    pub async fn connect(url: &str) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // One connection serialises writers, so deferred transactions never
        // deadlock on lock upgrade.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        tracing::info!(url, "SQLite store ready");

        Ok(Self { pool })
    }

    async fn stored_version(
        tx: &mut Transaction<'_, Sqlite>,
        id: &SignalId,
    ) -> Result<Option<i64>, PersistenceError> {
        let version: Option<(i64,)> = sqlx::query_as("SELECT version FROM signals WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut **tx)
            .await?;
        Ok(version.map(|(v,)| v))
    }

    async fn apply_op(
        tx: &mut Transaction<'_, Sqlite>,
        op: WriteOp,
    ) -> Result<(), PersistenceError> {
        match op {
            WriteOp::InsertSignal(signal) => {
                let levels = signal.levels();
                sqlx::query(&format!(
                    "INSERT INTO signals ({SIGNAL_COLUMNS}) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ))
                .bind(signal.id().as_str())
                .bind(signal.strategy_id().as_str())
                .bind(signal.symbol().as_str())
                .bind(signal.asset_class().as_str())
                .bind(signal.status().as_str())
                .bind(levels.entry.to_string())
                .bind(levels.stop_loss.to_string())
                .bind(levels.take_profit[0].to_string())
                .bind(levels.take_profit[1].to_string())
                .bind(levels.take_profit[2].to_string())
                .bind(signal.valid_until())
                .bind(signal.notification_thread().map(ThreadId::as_str))
                .bind(signal.broker_order_id().map(BrokerOrderId::as_str))
                .bind(signal.created_at())
                .bind(signal.updated_at())
                .bind(signal.archived_at())
                .bind(version_param(signal.version())?)
                .execute(&mut **tx)
                .await
                .map_err(|e| duplicate_or(e, format!("signal {}", signal.id())))?;
            }
            WriteOp::UpdateSignal(signal) => {
                let expected = signal.version();
                let result = sqlx::query(
                    "UPDATE signals SET status = ?, broker_order_id = ?, \
                     notification_thread = ?, updated_at = ?, archived_at = ?, \
                     version = version + 1 \
                     WHERE id = ? AND version = ?",
                )
                .bind(signal.status().as_str())
                .bind(signal.broker_order_id().map(BrokerOrderId::as_str))
                .bind(signal.notification_thread().map(ThreadId::as_str))
                .bind(signal.updated_at())
                .bind(signal.archived_at())
                .bind(signal.id().as_str())
                .bind(version_param(expected)?)
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(match Self::stored_version(tx, signal.id()).await? {
                        None => PersistenceError::NotFound(format!("signal {}", signal.id())),
                        Some(actual) => PersistenceError::VersionConflict {
                            signal_id: signal.id().clone(),
                            expected,
                            actual: u64::try_from(actual).unwrap_or_default(),
                        },
                    });
                }
            }
            WriteOp::DeleteSignal(id) => {
                sqlx::query("DELETE FROM positions WHERE signal_id = ?")
                    .bind(id.as_str())
                    .execute(&mut **tx)
                    .await?;
                let result = sqlx::query("DELETE FROM signals WHERE id = ?")
                    .bind(id.as_str())
                    .execute(&mut **tx)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(PersistenceError::NotFound(format!("signal {id}")));
                }
            }
            WriteOp::UpsertPosition(position) => {
                if Self::stored_version(tx, &position.signal_id).await?.is_none() {
                    return Err(PersistenceError::NotFound(format!(
                        "signal {} for position {}",
                        position.signal_id, position.id
                    )));
                }
                sqlx::query(&format!(
                    "INSERT INTO positions ({POSITION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(signal_id) DO UPDATE SET \
                     id = excluded.id, symbol = excluded.symbol, \
                     entry_price = excluded.entry_price, quantity = excluded.quantity, \
                     stop_loss = excluded.stop_loss, opened_at = excluded.opened_at, \
                     updated_at = excluded.updated_at"
                ))
                .bind(position.signal_id.as_str())
                .bind(position.id.as_str())
                .bind(position.symbol.as_str())
                .bind(position.entry_price.to_string())
                .bind(position.quantity.to_string())
                .bind(position.stop_loss.to_string())
                .bind(position.opened_at)
                .bind(position.updated_at)
                .execute(&mut **tx)
                .await
                .map_err(|e| duplicate_or(e, format!("position {}", position.id)))?;
            }
            WriteOp::DeletePosition(id) => {
                sqlx::query("DELETE FROM positions WHERE signal_id = ?")
                    .bind(id.as_str())
                    .execute(&mut **tx)
                    .await?;
            }
            WriteOp::AppendRecord(record) => {
                sqlx::query(&format!(
                    "INSERT INTO reconciliation_records ({RECORD_COLUMNS}) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
                ))
                .bind(record.id.as_str())
                .bind(record.symbol.as_str())
                .bind(record.signal_id.as_ref().map(SignalId::as_str))
                .bind(record.kind.as_str())
                .bind(record.action.as_str())
                .bind(record.store_quantity.to_string())
                .bind(record.broker_quantity.to_string())
                .bind(record.recorded_at)
                .execute(&mut **tx)
                .await
                .map_err(|e| duplicate_or(e, format!("record {}", record.id)))?;
            }
            WriteOp::MarkArchived { signal_id, at } => {
                let result = sqlx::query(
                    "UPDATE signals SET archived_at = ?, version = version + 1 WHERE id = ?",
                )
                .bind(at)
                .bind(signal_id.as_str())
                .execute(&mut **tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(PersistenceError::NotFound(format!("signal {signal_id}")));
                }
            }
        }
        Ok(())
    }

    /// A position may only exist while its signal holds one.
    async fn check_positions(tx: &mut Transaction<'_, Sqlite>) -> Result<(), PersistenceError> {
        let holding: Vec<&str> = SignalStatus::ALL
            .into_iter()
            .filter(|s| s.holds_position())
            .map(|s| s.as_str())
            .collect();
        let placeholders = vec!["?"; holding.len()].join(", ");

        let sql = format!(
            "SELECT p.id, p.signal_id, s.status FROM positions p \
             LEFT JOIN signals s ON s.id = p.signal_id \
             WHERE s.id IS NULL OR s.status NOT IN ({placeholders}) LIMIT 1"
        );
        let mut query = sqlx::query_as::<_, (String, String, Option<String>)>(&sql);
        for status in holding {
            query = query.bind(status);
        }

        match query.fetch_optional(&mut **tx).await? {
            None => Ok(()),
            Some((position_id, signal_id, Some(status))) => Err(PersistenceError::CommitFailed(
                format!("position {position_id} left linked to {status} signal {signal_id}"),
            )),
            Some((position_id, signal_id, None)) => Err(PersistenceError::CommitFailed(format!(
                "position {position_id} has no signal {signal_id}"
            ))),
        }
    }
}

#[async_trait]
impl SignalRepository for SqliteSignalStore {
    async fn find_by_id(&self, id: &SignalId) -> Result<Option<Signal>, PersistenceError> {
        sqlx::query_as::<_, SignalRow>(&format!(
            "SELECT {SIGNAL_COLUMNS} FROM signals WHERE id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(Signal::try_from)
        .transpose()
    }

    async fn find_by_status(
        &self,
        statuses: &[SignalStatus],
    ) -> Result<Vec<Signal>, PersistenceError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {SIGNAL_COLUMNS} FROM signals WHERE status IN ({placeholders}) \
             ORDER BY created_at, id"
        );
        let mut query = sqlx::query_as::<_, SignalRow>(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Signal::try_from)
            .collect()
    }

    async fn position_for(
        &self,
        signal_id: &SignalId,
    ) -> Result<Option<Position>, PersistenceError> {
        sqlx::query_as::<_, PositionRow>(&format!(
            "SELECT {POSITION_COLUMNS} FROM positions WHERE signal_id = ?"
        ))
        .bind(signal_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(Position::try_from)
        .transpose()
    }

    async fn positions(&self) -> Result<Vec<Position>, PersistenceError> {
        sqlx::query_as::<_, PositionRow>(&format!(
            "SELECT {POSITION_COLUMNS} FROM positions ORDER BY opened_at"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Position::try_from)
        .collect()
    }

    async fn records(
        &self,
        symbol: Option<&Symbol>,
    ) -> Result<Vec<ReconciliationRecord>, PersistenceError> {
        let rows = match symbol {
            Some(symbol) => {
                sqlx::query_as::<_, RecordRow>(&format!(
                    "SELECT {RECORD_COLUMNS} FROM reconciliation_records \
                     WHERE symbol = ? ORDER BY rowid"
                ))
                .bind(symbol.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RecordRow>(&format!(
                    "SELECT {RECORD_COLUMNS} FROM reconciliation_records ORDER BY rowid"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(ReconciliationRecord::try_from).collect()
    }

    async fn records_for_signal(
        &self,
        signal_id: &SignalId,
    ) -> Result<Vec<ReconciliationRecord>, PersistenceError> {
        sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM reconciliation_records \
             WHERE signal_id = ? ORDER BY rowid"
        ))
        .bind(signal_id.as_str())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ReconciliationRecord::try_from)
        .collect()
    }
}

#[async_trait]
impl UnitOfWork for SqliteSignalStore {
    async fn apply_batch(&self, ops: Vec<WriteOp>) -> Result<CommitReceipt, PersistenceError> {
        let ops_applied = ops.len();
        let mut tx = self.pool.begin().await?;

        for op in ops {
            Self::apply_op(&mut tx, op).await?;
        }
        Self::check_positions(&mut tx).await?;

        tx.commit()
            .await
            .map_err(|e| PersistenceError::CommitFailed(e.to_string()))?;

        Ok(CommitReceipt {
            ops_applied,
            committed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal_lifecycle::SignalStateMachine;
    use crate::domain::signal_lifecycle::aggregate::test_support::{signal_in, waiting_signal};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    async fn store() -> (SqliteSignalStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("signals.db").display());
        (SqliteSignalStore::connect(&url).await.unwrap(), dir)
    }

    fn position_for(signal: &Signal) -> Position {
        Position::open(
            signal.id().clone(),
            signal.symbol().clone(),
            dec!(100),
            dec!(5),
            dec!(95),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_and_find_round_trips() {
        let (store, _dir) = store().await;
        let signal = waiting_signal("sig-1", "AAPL");
        store
            .apply_batch(vec![WriteOp::InsertSignal(signal.clone())])
            .await
            .unwrap();

        let found = store.find_by_id(signal.id()).await.unwrap().unwrap();
        assert_eq!(found, signal);
        assert!(
            store
                .find_by_id(&SignalId::new("missing"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn duplicate_insert_rejected() {
        let (store, _dir) = store().await;
        let signal = waiting_signal("sig-1", "AAPL");
        store
            .apply_batch(vec![WriteOp::InsertSignal(signal.clone())])
            .await
            .unwrap();
        let err = store
            .apply_batch(vec![WriteOp::InsertSignal(signal)])
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Duplicate(_)));
    }

    #[tokio::test]
    async fn version_conflict_rolls_back_whole_batch() {
        let (store, _dir) = store().await;
        let signal = waiting_signal("sig-1", "AAPL");
        store
            .apply_batch(vec![WriteOp::InsertSignal(signal.clone())])
            .await
            .unwrap();

        let (active, _) =
            SignalStateMachine::apply(signal.clone(), SignalStatus::Active, Utc::now()).unwrap();
        store
            .apply_batch(vec![WriteOp::UpdateSignal(active)])
            .await
            .unwrap();

        let (stale, _) =
            SignalStateMachine::apply(signal.clone(), SignalStatus::Expired, Utc::now()).unwrap();
        let err = store
            .apply_batch(vec![
                WriteOp::InsertSignal(waiting_signal("sig-2", "MSFT")),
                WriteOp::UpdateSignal(stale),
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PersistenceError::VersionConflict {
                expected: 0,
                actual: 1,
                ..
            }
        ));
        assert!(
            store
                .find_by_id(&SignalId::new("sig-2"))
                .await
                .unwrap()
                .is_none()
        );
        let stored = store.find_by_id(signal.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), SignalStatus::Active);
        assert_eq!(stored.version(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_signal_is_not_found() {
        let (store, _dir) = store().await;
        let err = store
            .apply_batch(vec![WriteOp::UpdateSignal(waiting_signal("ghost", "AAPL"))])
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }

    #[tokio::test]
    async fn position_must_follow_a_holding_signal() {
        let (store, _dir) = store().await;
        let signal = signal_in("sig-1", "AAPL", SignalStatus::Active);
        store
            .apply_batch(vec![
                WriteOp::InsertSignal(signal.clone()),
                WriteOp::UpsertPosition(position_for(&signal)),
            ])
            .await
            .unwrap();
        assert_eq!(store.positions().await.unwrap().len(), 1);

        let (closed, _) =
            SignalStateMachine::apply(signal, SignalStatus::ClosedManual, Utc::now()).unwrap();
        let err = store
            .apply_batch(vec![WriteOp::UpdateSignal(closed.clone())])
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::CommitFailed(_)));
        assert_eq!(
            store.find_by_id(closed.id()).await.unwrap().unwrap().status(),
            SignalStatus::Active
        );

        store
            .apply_batch(vec![
                WriteOp::UpdateSignal(closed.clone()),
                WriteOp::DeletePosition(closed.id().clone()),
                WriteOp::AppendRecord(ReconciliationRecord::new(
                    closed.symbol().clone(),
                    Some(closed.id().clone()),
                    MismatchKind::OrphanPosition,
                    dec!(5),
                    Decimal::ZERO,
                    Utc::now(),
                )),
            ])
            .await
            .unwrap();

        assert!(store.positions().await.unwrap().is_empty());
        let records = store.records_for_signal(closed.id()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, CorrectiveAction::ForcedClose);
    }

    #[tokio::test]
    async fn position_for_waiting_signal_is_rejected() {
        let (store, _dir) = store().await;
        let signal = waiting_signal("sig-1", "AAPL");
        let err = store
            .apply_batch(vec![
                WriteOp::InsertSignal(signal.clone()),
                WriteOp::UpsertPosition(position_for(&signal)),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::CommitFailed(_)));
        assert!(store.find_by_id(signal.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_status_filters_and_orders() {
        let (store, _dir) = store().await;
        let first = waiting_signal("sig-b", "AAPL");
        let second = waiting_signal("sig-a", "MSFT");
        let active = signal_in("sig-c", "TSLA", SignalStatus::Active);
        store
            .apply_batch(vec![
                WriteOp::InsertSignal(first.clone()),
                WriteOp::InsertSignal(second.clone()),
                WriteOp::InsertSignal(active),
            ])
            .await
            .unwrap();

        let waiting = store
            .find_by_status(&[SignalStatus::Waiting])
            .await
            .unwrap();
        let ids: Vec<&str> = waiting.iter().map(|s| s.id().as_str()).collect();
        assert_eq!(ids, vec![first.id().as_str(), second.id().as_str()]);
        assert_eq!(store.find_non_terminal().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn archive_then_delete() {
        let (store, _dir) = store().await;
        let signal = signal_in("sig-1", "AAPL", SignalStatus::Expired);
        store
            .apply_batch(vec![WriteOp::InsertSignal(signal.clone())])
            .await
            .unwrap();

        let at = Utc::now();
        store
            .apply_batch(vec![WriteOp::MarkArchived {
                signal_id: signal.id().clone(),
                at,
            }])
            .await
            .unwrap();
        let archived = store.find_by_id(signal.id()).await.unwrap().unwrap();
        assert_eq!(archived.archived_at(), Some(at));
        assert_eq!(archived.version(), 1);

        store
            .apply_batch(vec![WriteOp::DeleteSignal(signal.id().clone())])
            .await
            .unwrap();
        assert!(store.find_by_id(signal.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn records_filter_by_symbol() {
        let (store, _dir) = store().await;
        let record = |symbol: &str| {
            WriteOp::AppendRecord(ReconciliationRecord::new(
                Symbol::new(symbol),
                None,
                MismatchKind::QuantityDrift,
                dec!(5),
                dec!(3),
                Utc::now(),
            ))
        };
        store
            .apply_batch(vec![record("AAPL"), record("MSFT"), record("AAPL")])
            .await
            .unwrap();

        assert_eq!(store.records(None).await.unwrap().len(), 3);
        let aapl = store.records(Some(&Symbol::new("AAPL"))).await.unwrap();
        assert_eq!(aapl.len(), 2);
        assert_eq!(aapl[0].broker_quantity, dec!(3));
    }
}
