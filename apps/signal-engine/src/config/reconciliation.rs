//! Reconciliation configuration for periodic broker sync.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::brokers::BrokerConfig;
use crate::application::services::{
    GatewayConfig, RetryPolicy, SchedulerConfig, duration_ms,
};
use crate::application::use_cases::ReconcileConfig;

/// Reconciliation configuration for periodic broker sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Enable periodic reconciliation.
    pub enabled: bool,
    /// Expire stale `WAITING` signals on each tick.
    pub expiry_enabled: bool,
    /// Time between cycles.
    #[serde(with = "duration_ms")]
    pub interval: Duration,
    /// Time budget for one cycle.
    #[serde(with = "duration_ms")]
    pub cycle_deadline: Duration,
    /// Symbols processed at once.
    pub max_concurrency: usize,
    /// Retry policy for rate-limited broker calls.
    pub rate_limit: RetryPolicy,
    /// Longest server backoff hint to wait out; a longer hint skips the batch.
    #[serde(with = "duration_ms")]
    pub max_retry_after: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        let cycle = ReconcileConfig::default();
        let scheduler = SchedulerConfig::default();
        let gateway = GatewayConfig::default();
        Self {
            enabled: scheduler.reconcile_enabled,
            expiry_enabled: scheduler.expiry_enabled,
            interval: scheduler.interval,
            cycle_deadline: cycle.cycle_deadline,
            max_concurrency: cycle.max_concurrency,
            rate_limit: gateway.rate_limit,
            max_retry_after: gateway.max_retry_after,
        }
    }
}

impl ReconciliationConfig {
    /// Settings for one reconciliation cycle.
    #[must_use]
    pub const fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            max_concurrency: self.max_concurrency,
            cycle_deadline: self.cycle_deadline,
        }
    }

    /// Settings for the tick loop.
    #[must_use]
    pub const fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: self.interval,
            reconcile_enabled: self.enabled,
            expiry_enabled: self.expiry_enabled,
        }
    }

    /// Gateway settings, combining broker limits with the retry budget.
    #[must_use]
    pub fn gateway_config(&self, broker: &BrokerConfig) -> GatewayConfig {
        GatewayConfig {
            batch_size: broker.batch_size,
            call_timeout: broker.call_timeout,
            rate_limit: self.rate_limit.clone(),
            max_retry_after: self.max_retry_after,
        }
    }
}
