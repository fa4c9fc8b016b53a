//! Notification Gate
//!
//! Releases a notification only after the commit it describes succeeded.
//! Delivery runs on a tracked background task: callers never wait on the
//! sink, and sink failures are retried a bounded number of times and then
//! logged. They never reach back into the commit.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::task::TaskTracker;

use super::backoff::duration_ms;
use crate::application::ports::{Notification, NotificationError, NotificationSink};
use crate::domain::signal_lifecycle::{CommitReceipt, PersistenceError};
use crate::telemetry;

/// Notification delivery policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPolicy {
    /// Attempts per notification, including the first.
    pub max_attempts: u32,
    /// Timeout for a single attempt.
    #[serde(with = "duration_ms")]
    pub attempt_timeout: Duration,
    /// Pause between attempts.
    #[serde(with = "duration_ms")]
    pub retry_delay: Duration,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// What happened to a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Handed to a background delivery task.
    Queued,
    /// The commit failed, so the sink was never called.
    Suppressed,
    /// The sink accepted the notification.
    Delivered {
        /// Attempts used.
        attempts: u32,
    },
    /// Every attempt failed.
    Failed {
        /// Attempts used.
        attempts: u32,
        /// Last error.
        error: NotificationError,
    },
}

impl GateOutcome {
    /// Metric label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Suppressed => "suppressed",
            Self::Delivered { .. } => "delivered",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Notification gate.
pub struct NotificationGate<N>
where
    N: NotificationSink + ?Sized,
{
    sink: Arc<N>,
    policy: NotificationPolicy,
    deliveries: TaskTracker,
}

impl<N> NotificationGate<N>
where
    N: NotificationSink + ?Sized,
{
    /// Create a gate in front of a sink.
    pub fn new(sink: Arc<N>, policy: NotificationPolicy) -> Self {
        Self {
            sink,
            policy,
            deliveries: TaskTracker::new(),
        }
    }

    /// Forward `notification` if `commit` succeeded.
    ///
    /// Returns as soon as delivery is queued. The final outcome is logged and
    /// counted by the delivery task.
    pub fn notify(
        &self,
        notification: &Notification,
        commit: &Result<CommitReceipt, PersistenceError>,
    ) -> GateOutcome {
        if let Err(e) = commit {
            tracing::debug!(
                symbol = %notification.symbol,
                error = %e,
                "Commit failed, notification suppressed"
            );
            telemetry::record_notification(GateOutcome::Suppressed.as_str());
            return GateOutcome::Suppressed;
        }

        let sink = Arc::clone(&self.sink);
        let policy = self.policy.clone();
        let notification = notification.clone();
        self.deliveries.spawn(async move {
            let outcome = deliver(sink.as_ref(), &policy, &notification).await;
            telemetry::record_notification(outcome.as_str());
        });
        GateOutcome::Queued
    }

    /// Deliveries still in flight.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.deliveries.len()
    }

    /// Wait until every queued delivery has finished.
    pub async fn drain(&self) {
        self.deliveries.close();
        self.deliveries.wait().await;
        self.deliveries.reopen();
    }
}

async fn deliver<N>(
    sink: &N,
    policy: &NotificationPolicy,
    notification: &Notification,
) -> GateOutcome
where
    N: NotificationSink + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = NotificationError::Timeout;

    for attempt in 1..=max_attempts {
        let result = tokio::time::timeout(policy.attempt_timeout, sink.deliver(notification))
            .await
            .unwrap_or(Err(NotificationError::Timeout));

        match result {
            Ok(()) => {
                tracing::debug!(
                    sink = sink.name(),
                    symbol = %notification.symbol,
                    attempt,
                    "Notification delivered"
                );
                return GateOutcome::Delivered { attempts: attempt };
            }
            Err(e) => {
                tracing::warn!(
                    sink = sink.name(),
                    symbol = %notification.symbol,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Notification attempt failed"
                );
                last_error = e;
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(policy.retry_delay).await;
        }
    }

    tracing::error!(
        sink = sink.name(),
        symbol = %notification.symbol,
        signal_id = ?notification.signal_id,
        error = %last_error,
        "Notification dropped after retries"
    );
    GateOutcome::Failed {
        attempts: max_attempts,
        error: last_error,
    }
}
