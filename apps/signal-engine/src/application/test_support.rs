//! Shared fakes for application tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{Notification, NotificationError, NotificationSink};

/// Sink that records what it was asked to deliver.
pub struct RecordingSink {
    calls: AtomicUsize,
    fail_first: usize,
    hang: bool,
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    /// Sink that accepts everything.
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            hang: false,
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// Sink that rejects the first `n` deliveries.
    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first: n,
            ..Self::new()
        }
    }

    /// Sink that never answers.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new()
        }
    }

    /// Number of delivery attempts.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Notifications accepted.
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if call < self.fail_first {
            return Err(NotificationError::DeliveryFailed {
                message: "sink unavailable".to_string(),
            });
        }
        self.delivered.lock().push(notification.clone());
        Ok(())
    }
}
