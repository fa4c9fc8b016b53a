//! Use case errors.

use thiserror::Error;

use crate::application::services::GatewayError;
use crate::domain::shared::SignalId;
use crate::domain::signal_lifecycle::{PersistenceError, SignalError};

/// Errors returned by signal use cases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UseCaseError {
    /// Lifecycle rule violated.
    #[error(transparent)]
    Signal(#[from] SignalError),

    /// The store rejected the batch.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The broker could not serve the request.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// No signal with this id.
    #[error("Signal not found: {0}")]
    SignalNotFound(SignalId),

    /// Request does not fit the signal's current state.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
