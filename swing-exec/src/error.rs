//! Execution layer error types.

use thiserror::Error;

/// Errors that can occur during execution operations.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Exchange communication error
    #[error("Exchange error: {0}")]
    Exchange(String),

    /// Order was rejected by exchange
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Market data unavailable or malformed
    #[error("Market data error: {0}")]
    MarketData(String),

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] swing_domain::DomainError),

    /// Timeout waiting for operation
    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
