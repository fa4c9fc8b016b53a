//! Alpaca-specific error types.

use std::time::Duration;

use thiserror::Error;

use crate::application::ports::BrokerError;

/// Errors from the Alpaca adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlpacaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// API returned an error.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code from the API.
        code: String,
        /// Error message from the API.
        message: String,
    },

    /// Order was rejected.
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Authentication failed.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Server backoff hint, if one was sent.
        retry_after: Option<Duration>,
    },

    /// Network error (retryable).
    #[error("Network error: {0}")]
    Network(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Max retries exceeded.
    #[error("Max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// Invalid order request.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Resource not found.
    #[error("Not found: {path}")]
    NotFound {
        /// The path that was requested.
        path: String,
    },
}

impl AlpacaError {
    /// Returns true if Alpaca refused an order because its client order ID
    /// is already in use.
    #[must_use]
    pub fn is_duplicate_client_order_id(&self) -> bool {
        match self {
            Self::OrderRejected(message) | Self::Api { message, .. } => {
                let message = message.to_lowercase();
                message.contains("client_order_id") && message.contains("unique")
            }
            _ => false,
        }
    }
}

impl From<AlpacaError> for BrokerError {
    fn from(err: AlpacaError) -> Self {
        match err {
            AlpacaError::Http(msg) | AlpacaError::Network(msg) | AlpacaError::JsonParse(msg) => {
                Self::ConnectionError { message: msg }
            }
            AlpacaError::Api { code, message } => Self::Unknown {
                message: format!("{}: {}", code, message),
            },
            AlpacaError::OrderRejected(msg) | AlpacaError::InvalidOrder(msg) => {
                Self::OrderRejected { reason: msg }
            }
            AlpacaError::AuthenticationFailed => Self::AuthenticationFailed,
            AlpacaError::RateLimited { retry_after } => Self::RateLimited { retry_after },
            AlpacaError::MaxRetriesExceeded { attempts } => Self::ConnectionError {
                message: format!("Max retries exceeded after {} attempts", attempts),
            },
            AlpacaError::NotFound { path } => Self::Unknown {
                message: format!("Not found: {}", path),
            },
        }
    }
}
