//! Environment validation at startup.

use super::{BrokerProvider, Config, TradingMode};

/// Errors from environment validation at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupValidationError {
    /// Missing required credentials for the environment.
    #[error("Missing required credentials for {environment} mode: {details}")]
    MissingCredentials {
        /// The trading environment.
        environment: String,
        /// Details about which credentials are missing.
        details: String,
    },

    /// Invalid environment configuration.
    #[error("Invalid environment configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result of startup environment validation.
#[derive(Debug)]
pub struct StartupValidation {
    /// Warning messages (non-fatal).
    pub warnings: Vec<String>,
}

impl StartupValidation {
    /// Create a successful validation result.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Create a successful validation with warnings.
    #[must_use]
    pub const fn ok_with_warnings(warnings: Vec<String>) -> Self {
        Self { warnings }
    }
}

/// Validate the configured environment before any adapter is built.
///
/// The Alpaca provider needs credentials in both modes. LIVE mode refuses
/// the simulated broker, since nothing real would be reconciled.
///
/// # Errors
///
/// Returns `StartupValidationError` if credentials are missing or the
/// provider does not fit the mode.
pub fn validate_startup_environment(
    config: &Config,
) -> Result<StartupValidation, StartupValidationError> {
    let mode = config.environment.mode;
    let broker = &config.broker;

    match broker.provider {
        BrokerProvider::Simulated => {
            if mode.is_live() {
                return Err(StartupValidationError::InvalidConfiguration(
                    "LIVE mode cannot run against the simulated broker".to_string(),
                ));
            }
            let mut warnings = Vec::new();
            if !broker.api_key.is_empty() {
                warnings.push(
                    "Broker credentials configured but the simulated broker ignores them"
                        .to_string(),
                );
            }
            Ok(StartupValidation::ok_with_warnings(warnings))
        }
        BrokerProvider::Alpaca => {
            require_credentials(&broker.api_key, &broker.api_secret, mode).map_err(|details| {
                StartupValidationError::MissingCredentials {
                    environment: mode.to_string(),
                    details,
                }
            })?;

            if mode.is_live()
                && let Some(url) = &broker.base_url
                && url.contains("paper")
            {
                return Ok(StartupValidation::ok_with_warnings(vec![
                    "LIVE mode configured but using paper API URL. \
                     This may indicate misconfiguration."
                        .to_string(),
                ]));
            }

            Ok(StartupValidation::ok())
        }
    }
}

/// Validate that required credentials are present, returning a detailed error message.
///
/// # Errors
///
/// Returns an error string naming the missing variables.
pub fn require_credentials(
    api_key: &str,
    api_secret: &str,
    mode: TradingMode,
) -> Result<(), String> {
    if api_key.is_empty() || api_secret.is_empty() {
        return Err(format!(
            "Alpaca credentials required for {mode} mode.\n\n\
             Missing:\n\
             {}{}\n\
             To fix:\n\
             1. Set ALPACA_KEY and ALPACA_SECRET environment variables, or\n\
             2. Configure credentials in config.yaml under broker",
            if api_key.is_empty() {
                "  - ALPACA_KEY\n"
            } else {
                ""
            },
            if api_secret.is_empty() {
                "  - ALPACA_SECRET\n"
            } else {
                ""
            }
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BrokerConfig, EnvironmentConfig};

    fn alpaca_config(key: &str, secret: &str, mode: TradingMode) -> Config {
        Config {
            environment: EnvironmentConfig { mode },
            broker: BrokerConfig {
                provider: BrokerProvider::Alpaca,
                api_key: key.to_string(),
                api_secret: secret.to_string(),
                ..Default::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn simulated_paper_needs_no_credentials() {
        let validation = validate_startup_environment(&Config::default()).unwrap();
        assert!(validation.warnings.is_empty());
    }

    #[test]
    fn simulated_live_is_refused() {
        let mut config = Config::default();
        config.environment.mode = TradingMode::Live;
        let err = validate_startup_environment(&config).unwrap_err();
        assert!(matches!(err, StartupValidationError::InvalidConfiguration(_)));
    }

    #[test]
    fn alpaca_paper_requires_credentials() {
        let err = validate_startup_environment(&alpaca_config("", "", TradingMode::Paper))
            .unwrap_err();
        assert!(err.to_string().contains("PAPER"));
        assert!(err.to_string().contains("ALPACA_KEY"));
    }

    #[test]
    fn alpaca_with_credentials_ok() {
        assert!(
            validate_startup_environment(&alpaca_config("key", "secret", TradingMode::Paper))
                .is_ok()
        );
    }

    #[test]
    fn live_with_paper_url_warns() {
        let mut config = alpaca_config("key", "secret", TradingMode::Live);
        config.broker.base_url = Some("https://paper-api.alpaca.markets".to_string());
        let validation = validate_startup_environment(&config).unwrap();
        assert!(validation.warnings[0].contains("paper"));
    }

    #[test]
    fn partial_credentials_name_the_missing_one() {
        let err = require_credentials("key", "", TradingMode::Paper).unwrap_err();
        assert!(err.contains("ALPACA_SECRET"));
        assert!(!err.contains("ALPACA_KEY\n"));
    }
}
