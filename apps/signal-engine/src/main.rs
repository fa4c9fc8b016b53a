//! Signal Engine Binary
//!
//! Runs the reconciliation scheduler over the configured broker and store.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin signal-engine
//! ```
//!
//! # Environment Variables
//!
//! - `SIGNAL_ENGINE_CONFIG`: Path to the YAML config (default: config.yaml)
//! - `ALPACA_KEY` / `ALPACA_SECRET`: Broker credentials, when the config
//!   interpolates them
//! - `RUST_LOG`: Log filter, overrides `observability.logging.level`

use std::time::Duration;

use anyhow::Context;
use signal_engine::config::{self, validate_startup_environment};
use signal_engine::infrastructure::config::Container;
use signal_engine::telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Time allowed for the in-flight cycle to finish after shutdown is requested.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_ancestors();

    let path = config::config_path();
    let config = config::load_config(Some(&path))
        .with_context(|| format!("loading configuration from {path}"))?;

    telemetry::init_tracing(&config.observability.logging.level);
    if let Some(port) = config.observability.metrics_port {
        let addr = telemetry::init_metrics(port).context("starting metrics exporter")?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }

    let validation = validate_startup_environment(&config)?;
    for warning in &validation.warnings {
        tracing::warn!(warning = %warning, "Startup validation warning");
    }

    tracing::info!(
        mode = %config.environment.mode,
        broker = ?config.broker.provider,
        store = ?config.persistence.backend,
        interval_ms = config.reconciliation.interval.as_millis() as u64,
        "Starting signal engine"
    );
    if config.environment.mode.is_live() {
        tracing::warn!("LIVE trading mode: corrections act on real-money positions");
    }

    let container = Container::from_config(config)
        .await
        .context("building adapters")?;
    let scheduler = container.scheduler();
    let shutdown = CancellationToken::new();

    let run = scheduler.run(shutdown.clone());
    tokio::pin!(run);

    tokio::select! {
        () = &mut run => {
            tracing::warn!("Scheduler stopped before shutdown was requested");
        }
        () = shutdown_signal() => {
            shutdown.cancel();
            tracing::info!(
                timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                "Graceful shutdown started"
            );
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut run).await.is_err() {
                tracing::warn!("In-flight cycle did not finish before the shutdown timeout");
            }
        }
    }

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, container.drain_notifications())
        .await
        .is_err()
    {
        tracing::warn!("Queued notifications were not delivered before the shutdown timeout");
    }

    tracing::info!("Signal engine stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed the function returns at once, so the
/// engine shuts down rather than running without a way to stop it.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
