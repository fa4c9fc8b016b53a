//! Notification Adapters
//!
//! Implementations of the notification sink port.

mod log_sink;
mod webhook;

pub use log_sink::LogSink;
pub use webhook::{WebhookConfig, WebhookSink};
