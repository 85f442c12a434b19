//! Execution layer error types.

use std::time::Duration;

use thiserror::Error;

/// Exchange code reported when cancelling an order that is already closed.
pub const ORDER_NOT_OPEN: &str = "ORDER_NOT_OPEN";

/// Message used when a failed response carries no message.
pub const NO_MESSAGE: &str = "<no message>";

/// Errors that can occur during execution operations.
#[derive(Debug, Clone, Error)]
pub enum ExecError {
    /// Transient exchange failure, safe to retry
    #[error("Retryable exchange error: {message}")]
    Retryable {
        /// Machine code that classified the failure
        code: String,
        /// Human-readable message
        message: String,
    },

    /// Exchange failure that retrying will not fix
    #[error("Exchange error: {message}")]
    Fatal {
        /// Machine code, when the exchange sent one
        code: Option<String>,
        /// Human-readable message
        message: String,
    },

    /// Exchange never confirmed a cancelled order as closed
    #[error("Cancellation of order {order_id} not confirmed after {waited:?}")]
    CancelTimeout {
        /// Order being cancelled
        order_id: String,
        /// How long confirmation was awaited
        waited: Duration,
    },

    /// Exchange has no record of the order
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Private endpoint called without credentials
    #[error("Endpoint {0} requires API credentials")]
    Unauthenticated(&'static str),

    /// Successful response with an unusable payload
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] bourse_domain::DomainError),
}

impl ExecError {
    /// Whether the failure is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExecError::Retryable { .. })
    }

    /// Machine code of an exchange failure.
    pub fn code(&self) -> Option<&str> {
        match self {
            ExecError::Retryable { code, .. } => Some(code),
            ExecError::Fatal { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Whether the exchange reported the order as already closed.
    ///
    /// Exchanges put the reason in either the message or the code.
    pub fn is_order_not_open(&self) -> bool {
        match self {
            ExecError::Fatal { code, message } => {
                message == ORDER_NOT_OPEN || code.as_deref() == Some(ORDER_NOT_OPEN)
            },
            _ => false,
        }
    }
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
