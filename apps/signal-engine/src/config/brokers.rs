//! Broker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::services::{RetryPolicy, duration_ms};

/// Which broker adapter to run against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerProvider {
    /// In-process simulated book.
    #[default]
    Simulated,
    /// Alpaca Trading API.
    Alpaca,
}

/// Broker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Adapter to use.
    pub provider: BrokerProvider,
    /// API key ID.
    pub api_key: String,
    /// API secret key.
    pub api_secret: String,
    /// Override for the trading API base URL.
    pub base_url: Option<String>,
    /// HTTP request timeout.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    /// Retry policy for network errors and 5xx responses.
    pub retry: RetryPolicy,
    /// Maximum symbols per holdings request.
    pub batch_size: usize,
    /// Timeout for a single gateway call, retries included.
    #[serde(with = "duration_ms")]
    pub call_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            provider: BrokerProvider::default(),
            api_key: String::new(),
            api_secret: String::new(),
            base_url: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(100),
                ..RetryPolicy::default()
            },
            batch_size: 50,
            call_timeout: Duration::from_secs(10),
        }
    }
}
