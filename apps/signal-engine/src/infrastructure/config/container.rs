//! Dependency Injection Container
//!
//! Builds the adapters named by the configuration and wires them into the
//! application services and use cases.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::application::ports::{BrokerPort, ColdStorePort, NotificationError, NotificationSink};
use crate::application::services::{
    BrokerGateway, CycleScheduler, NotificationGate, PersistenceCoordinator,
};
use crate::application::use_cases::{
    ArchiveSignalsUseCase, ExpireStaleSignalsUseCase, OpenPositionUseCase, ReconcileUseCase,
    RegisterSignalUseCase, SubmitSignalOrderUseCase, TransitionSignalUseCase,
};
use crate::config::{BrokerProvider, Config, PersistenceBackend, TradingMode};
use crate::domain::signal_lifecycle::{PersistenceError, SignalStore};
use crate::infrastructure::archive::JsonLinesColdStore;
use crate::infrastructure::broker::{
    AlpacaBrokerAdapter, AlpacaConfig, AlpacaEnvironment, AlpacaError, SimulatedBroker,
};
use crate::infrastructure::notification::{LogSink, WebhookConfig, WebhookSink};
use crate::infrastructure::persistence::{InMemorySignalStore, SqliteSignalStore};

/// Broker port behind the gateway.
pub type DynBroker = dyn BrokerPort;
/// Operational store behind the coordinator.
pub type DynStore = dyn SignalStore;
/// Notification sink behind the gate.
pub type DynSink = dyn NotificationSink;
/// Cold store used for archival.
pub type DynColdStore = dyn ColdStorePort;

/// Scheduler over the configured adapters.
pub type EngineScheduler = CycleScheduler<DynBroker, DynStore, DynSink, DynColdStore>;

/// Errors while building adapters.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Broker adapter could not be built.
    #[error("Broker setup failed: {0}")]
    Broker(#[from] AlpacaError),

    /// Operational store could not be opened.
    #[error("Store setup failed: {0}")]
    Persistence(#[from] PersistenceError),

    /// Notification sink could not be built.
    #[error("Notification setup failed: {0}")]
    Notification(#[from] NotificationError),

    /// A data directory could not be created.
    #[error("Failed to create directory '{path}': {source}")]
    Io {
        /// Directory path.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },
}

/// Adapters chosen at startup.
pub struct Adapters {
    /// Broker port.
    pub broker: Arc<DynBroker>,
    /// Operational store.
    pub store: Arc<DynStore>,
    /// Notification sink.
    pub sink: Arc<DynSink>,
    /// Cold store.
    pub cold_store: Arc<DynColdStore>,
}

/// Dependency injection container.
///
/// Holds the shared services. Use cases are created on demand and share
/// the same gateway, coordinator and gate.
pub struct Container {
    config: Config,
    gateway: Arc<BrokerGateway<DynBroker>>,
    coordinator: Arc<PersistenceCoordinator<DynStore>>,
    gate: Arc<NotificationGate<DynSink>>,
    cold_store: Arc<DynColdStore>,
}

impl Container {
    /// Build every adapter named by `config` and wire the services.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError` if an adapter cannot be built.
    pub async fn from_config(config: Config) -> Result<Self, ContainerError> {
        let adapters = Adapters {
            broker: build_broker(&config)?,
            store: build_store(&config).await?,
            sink: build_sink(&config)?,
            cold_store: build_cold_store(&config).await?,
        };
        Ok(Self::from_adapters(config, adapters))
    }

    /// Wire services over adapters built elsewhere.
    #[must_use]
    pub fn from_adapters(config: Config, adapters: Adapters) -> Self {
        let gateway = Arc::new(BrokerGateway::new(
            adapters.broker,
            config.reconciliation.gateway_config(&config.broker),
        ));
        let coordinator = Arc::new(PersistenceCoordinator::new(adapters.store));
        let gate = Arc::new(NotificationGate::new(
            adapters.sink,
            config.notification.policy.clone(),
        ));
        Self {
            config,
            gateway,
            coordinator,
            gate,
            cold_store: adapters.cold_store,
        }
    }

    /// Loaded configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Trading mode.
    pub const fn mode(&self) -> TradingMode {
        self.config.environment.mode
    }

    /// Read access to the operational store.
    pub fn store(&self) -> Arc<DynStore> {
        Arc::clone(self.coordinator.store())
    }

    /// Wait for queued notifications to finish delivering.
    pub async fn drain_notifications(&self) {
        self.gate.drain().await;
    }

    /// Create a `RegisterSignalUseCase`.
    pub fn register_signal(&self) -> RegisterSignalUseCase<DynStore, DynSink> {
        RegisterSignalUseCase::new(Arc::clone(&self.coordinator), Arc::clone(&self.gate))
    }

    /// Create a `TransitionSignalUseCase`.
    pub fn transition_signal(&self) -> TransitionSignalUseCase<DynStore, DynSink> {
        TransitionSignalUseCase::new(Arc::clone(&self.coordinator), Arc::clone(&self.gate))
    }

    /// Create a `SubmitSignalOrderUseCase`.
    pub fn submit_signal_order(&self) -> SubmitSignalOrderUseCase<DynBroker, DynStore> {
        SubmitSignalOrderUseCase::new(Arc::clone(&self.gateway), Arc::clone(&self.coordinator))
    }

    /// Create an `OpenPositionUseCase`.
    pub fn open_position(&self) -> OpenPositionUseCase<DynStore, DynSink> {
        OpenPositionUseCase::new(Arc::clone(&self.coordinator), Arc::clone(&self.gate))
    }

    /// Create a `ReconcileUseCase`.
    pub fn reconcile(&self) -> ReconcileUseCase<DynBroker, DynStore, DynSink> {
        ReconcileUseCase::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.coordinator),
            Arc::clone(&self.gate),
            self.config.reconciliation.reconcile_config(),
        )
    }

    /// Create an `ExpireStaleSignalsUseCase`.
    pub fn expire_stale_signals(&self) -> ExpireStaleSignalsUseCase<DynStore, DynSink> {
        ExpireStaleSignalsUseCase::new(self.store(), Arc::new(self.transition_signal()))
    }

    /// Create an `ArchiveSignalsUseCase`, or `None` when archival is disabled.
    pub fn archive_signals(&self) -> Option<ArchiveSignalsUseCase<DynStore, DynColdStore>> {
        self.config.archive.enabled.then(|| {
            ArchiveSignalsUseCase::new(
                Arc::clone(&self.coordinator),
                Arc::clone(&self.cold_store),
                self.config.archive.retention(),
            )
        })
    }

    /// Create the tick scheduler.
    pub fn scheduler(&self) -> EngineScheduler {
        CycleScheduler::new(
            Arc::new(self.reconcile()),
            Arc::new(self.expire_stale_signals()),
            self.archive_signals().map(Arc::new),
            self.config.reconciliation.scheduler_config(),
        )
    }
}

fn build_broker(config: &Config) -> Result<Arc<DynBroker>, ContainerError> {
    match config.broker.provider {
        BrokerProvider::Simulated => {
            tracing::info!("Using simulated broker");
            Ok(Arc::new(SimulatedBroker::new()))
        }
        BrokerProvider::Alpaca => {
            let environment = match config.environment.mode {
                TradingMode::Paper => AlpacaEnvironment::Paper,
                TradingMode::Live => AlpacaEnvironment::Live,
            };
            let broker = &config.broker;
            let mut alpaca = AlpacaConfig::new(
                broker.api_key.clone(),
                broker.api_secret.clone(),
                environment,
            )
            .with_timeout(broker.timeout)
            .with_retry(broker.retry.clone());
            if let Some(url) = &broker.base_url {
                alpaca = alpaca.with_base_url(url.clone());
            }
            let adapter = AlpacaBrokerAdapter::new(alpaca)?;
            tracing::info!(%environment, "Using Alpaca broker");
            Ok(Arc::new(adapter))
        }
    }
}

async fn ensure_parent_dir(path: &str) -> Result<(), ContainerError> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ContainerError::Io {
                path: parent.display().to_string(),
                source,
            })?;
    }
    Ok(())
}

async fn build_store(config: &Config) -> Result<Arc<DynStore>, ContainerError> {
    match config.persistence.backend {
        PersistenceBackend::Memory => {
            tracing::warn!("Using in-memory store, state is lost on exit");
            Ok(Arc::new(InMemorySignalStore::new()))
        }
        PersistenceBackend::Sqlite => {
            ensure_parent_dir(&config.persistence.db_path).await?;
            let store = SqliteSignalStore::connect(&config.persistence.sqlite_url()).await?;
            Ok(Arc::new(store))
        }
    }
}

fn build_sink(config: &Config) -> Result<Arc<DynSink>, ContainerError> {
    let notification = &config.notification;
    match &notification.webhook_url {
        Some(url) => {
            let mut webhook = WebhookConfig::new(url.clone());
            webhook.display_name.clone_from(&notification.display_name);
            Ok(Arc::new(WebhookSink::new(webhook)?))
        }
        None => {
            tracing::info!("No webhook configured, notifications go to the log");
            Ok(Arc::new(LogSink::new()))
        }
    }
}

async fn build_cold_store(config: &Config) -> Result<Arc<DynColdStore>, ContainerError> {
    if config.archive.enabled {
        ensure_parent_dir(&config.archive.path).await?;
    }
    Ok(Arc::new(JsonLinesColdStore::new(&config.archive.path)))
}
