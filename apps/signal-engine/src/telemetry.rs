//! Logging and Metrics Setup
//!
//! Structured logging through `tracing` with an `EnvFilter`, and counters and
//! histograms through the `metrics` facade. The Prometheus exporter is only
//! installed when a metrics port is configured; without it the recording
//! functions below are no-ops.
//!
//! # Metrics
//!
//! - `signal_engine_reconcile_cycles_total`: Cycles run, by outcome
//! - `signal_engine_reconcile_cycle_seconds`: Cycle duration
//! - `signal_engine_mismatches_total`: Mismatches found, by kind
//! - `signal_engine_commit_failures_total`: Rejected batches, by reason
//! - `signal_engine_notifications_total`: Notification gate outcomes
//! - `signal_engine_rate_limit_exhausted_total`: Broker calls that gave up on 429s

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Calling this twice is
/// harmless; the second subscriber is not installed.
pub fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Install the Prometheus exporter on `port` and describe all metrics.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns error if the listener or recorder cannot be installed.
pub fn init_metrics(port: u16) -> Result<SocketAddr, BuildError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_metrics();
    Ok(addr)
}

fn register_metrics() {
    describe_counter!(
        "signal_engine_reconcile_cycles_total",
        "Reconciliation cycles run, by outcome"
    );
    describe_histogram!(
        "signal_engine_reconcile_cycle_seconds",
        "Wall time of a reconciliation cycle"
    );
    describe_counter!(
        "signal_engine_mismatches_total",
        "Store/broker mismatches found, by kind"
    );
    describe_counter!(
        "signal_engine_commit_failures_total",
        "Batches rejected by the operational store"
    );
    describe_counter!(
        "signal_engine_notifications_total",
        "Notification gate outcomes"
    );
    describe_counter!(
        "signal_engine_rate_limit_exhausted_total",
        "Broker calls abandoned after repeated rate limiting"
    );
}

/// Record a finished reconciliation cycle.
pub fn record_cycle(outcome: &'static str, duration: Duration) {
    counter!("signal_engine_reconcile_cycles_total", "outcome" => outcome).increment(1);
    histogram!("signal_engine_reconcile_cycle_seconds").record(duration.as_secs_f64());
}

/// Record a detected mismatch.
pub fn record_mismatch(kind: &'static str) {
    counter!("signal_engine_mismatches_total", "kind" => kind).increment(1);
}

/// Record a rejected batch.
pub fn record_commit_failure(reason: &'static str) {
    counter!("signal_engine_commit_failures_total", "reason" => reason).increment(1);
}

/// Record a notification gate outcome.
pub fn record_notification(outcome: &'static str) {
    counter!("signal_engine_notifications_total", "outcome" => outcome).increment(1);
}

/// Record a broker call that gave up after rate limiting.
pub fn record_rate_limit_exhausted(operation: &'static str) {
    counter!("signal_engine_rate_limit_exhausted_total", "operation" => operation).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_exporter_is_noop() {
        record_cycle("completed", Duration::from_millis(5));
        record_mismatch("orphan_position");
        record_commit_failure("version_conflict");
        record_notification("delivered");
        record_rate_limit_exhausted("get_positions");
    }

    #[test]
    fn init_tracing_twice_does_not_panic() {
        init_tracing("info");
        init_tracing("debug");
    }
}
