//! Sink that writes notifications to the log.
//!
//! Used when no webhook is configured.

use async_trait::async_trait;

use crate::application::ports::{Notification, NotificationError, NotificationSink};

/// Notification sink backed by `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    /// Create a log sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        tracing::info!(
            symbol = %notification.symbol,
            signal_id = ?notification.signal_id,
            status = ?notification.status,
            thread = ?notification.thread_id,
            detail = %notification.detail,
            "{}",
            notification.headline
        );
        Ok(())
    }
}
