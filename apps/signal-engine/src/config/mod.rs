//! Configuration module for the signal engine.
//!
//! Loads YAML configuration with environment variable interpolation and
//! validates it before any adapter is built.
//!
//! # Usage
//!
//! ```rust,ignore
//! use signal_engine::config::{config_path, load_config};
//!
//! // Path from SIGNAL_ENGINE_CONFIG, falling back to config.yaml
//! let config = load_config(Some(&config_path()))?;
//!
//! println!("mode: {}", config.environment.mode);
//! ```

mod archive;
mod brokers;
mod environment;
mod notification;
mod observability;
mod persistence;
mod reconciliation;
mod validation;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use archive::ArchiveConfig;
pub use brokers::{BrokerConfig, BrokerProvider};
pub use environment::{EnvironmentConfig, TradingMode};
pub use notification::NotificationConfig;
pub use observability::{LoggingConfig, ObservabilityConfig};
pub use persistence::{PersistenceBackend, PersistenceConfig};
pub use reconciliation::ReconciliationConfig;
pub use validation::{
    StartupValidation, StartupValidationError, require_credentials, validate_startup_environment,
};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "SIGNAL_ENGINE_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Environment configuration.
    #[serde(default)]
    pub environment: EnvironmentConfig,
    /// Broker configuration.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Operational store configuration.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Reconciliation configuration for periodic broker sync.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// Archival of terminal signals.
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// Notification configuration.
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Configuration path from `SIGNAL_ENGINE_CONFIG`, or `config.yaml`.
#[must_use]
pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_VAR)
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Load configuration from a YAML file with environment variable interpolation.
///
/// A missing file yields the defaults.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path, "Config file not found, using defaults");
            let config = Config::default();
            validate_config(&config)?;
            return Ok(config);
        }
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_string(),
                source: e,
            });
        }
    };

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let default_value = caps.get(2).map_or("", |m| m.as_str());
        match std::env::var(&caps[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

fn require(condition: bool, message: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(message.to_string()))
    }
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let broker = &config.broker;
    require(broker.batch_size > 0, "broker.batch_size must be positive")?;
    require(!broker.timeout.is_zero(), "broker.timeout must be positive")?;
    require(
        !broker.call_timeout.is_zero(),
        "broker.call_timeout must be positive",
    )?;
    require(
        broker.retry.max_attempts > 0,
        "broker.retry.max_attempts must be at least 1",
    )?;

    let recon = &config.reconciliation;
    require(
        recon.interval >= Duration::from_secs(1),
        "reconciliation.interval must be at least one second",
    )?;
    require(
        !recon.cycle_deadline.is_zero(),
        "reconciliation.cycle_deadline must be positive",
    )?;
    require(
        recon.max_concurrency > 0,
        "reconciliation.max_concurrency must be at least 1",
    )?;
    require(
        recon.rate_limit.max_attempts > 0,
        "reconciliation.rate_limit.max_attempts must be at least 1",
    )?;
    require(
        recon.rate_limit.multiplier >= 1.0,
        "reconciliation.rate_limit.multiplier must be at least 1.0",
    )?;

    if config.persistence.backend == PersistenceBackend::Sqlite {
        require(
            !config.persistence.db_path.trim().is_empty(),
            "persistence.db_path must be set for the sqlite backend",
        )?;
    }

    if config.archive.enabled {
        require(
            !config.archive.path.trim().is_empty(),
            "archive.path must be set when archival is enabled",
        )?;
    }

    let notification = &config.notification;
    require(
        notification.policy.max_attempts > 0,
        "notification.max_attempts must be at least 1",
    )?;
    if let Some(url) = &notification.webhook_url {
        require(
            url.starts_with("http://") || url.starts_with("https://"),
            "notification.webhook_url must be an http(s) URL",
        )?;
    }

    Ok(())
}
