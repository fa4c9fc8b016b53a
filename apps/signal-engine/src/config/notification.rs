//! Notification configuration.

use serde::{Deserialize, Serialize};

use crate::application::services::NotificationPolicy;

/// Notification sink and delivery policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Webhook URL. Notifications go to the log when unset.
    pub webhook_url: Option<String>,
    /// Name messages are posted under.
    pub display_name: Option<String>,
    /// Attempts, per-attempt timeout and retry delay.
    #[serde(flatten)]
    pub policy: NotificationPolicy,
}
