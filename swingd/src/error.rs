//! Daemon error types.

use swing_domain::{DomainError, PositionId};
use swing_engine::EngineError;
use swing_exec::ExecError;
use swing_store::StoreError;
use thiserror::Error;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Engine error (sizing, analysis)
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Execution error
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A position is already open
    #[error("Position already open: {0}")]
    PositionAlreadyOpen(PositionId),

    /// No position to operate on
    #[error("No open position")]
    NoOpenPosition,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unrecoverable startup failure
    #[error("Startup failed: {0}")]
    Startup(String),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
