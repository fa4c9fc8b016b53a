//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up IDs from different contexts.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(SignalId, "Unique identifier for a trading signal.");
define_id!(StrategyId, "Identifier of the strategy that emitted a signal.");
define_id!(PositionId, "Unique identifier for a stored position.");
define_id!(BrokerOrderId, "Broker's unique identifier for an order.");
define_id!(
    ClientOrderId,
    "Client-supplied order identifier, used by the broker as an idempotency key."
);
define_id!(RecordId, "Unique identifier for a reconciliation record.");
define_id!(
    ThreadId,
    "Identifier of the external notification thread a signal reports into."
);

/// Namespace for deterministic client order IDs.
const CLIENT_ORDER_NAMESPACE: uuid::Uuid = uuid::Uuid::from_u128(0x6a1c_2f0e_93d4_4b7a_8e55_0c3b_d1f4_a209);

impl ClientOrderId {
    /// Derive a stable idempotency key from a signal and an order purpose.
    ///
    /// The same inputs always produce the same key, so a retried placement
    /// is recognised by the broker as the original order.
    #[must_use]
    pub fn derive(signal_id: &SignalId, purpose: &str) -> Self {
        let name = format!("{}:{}", signal_id.as_str(), purpose);
        Self(uuid::Uuid::new_v5(&CLIENT_ORDER_NAMESPACE, name.as_bytes()).to_string())
    }
}
