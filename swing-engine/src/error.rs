//! Engine errors.

use rust_decimal::Decimal;
use swing_domain::DomainError;
use thiserror::Error;

/// Errors produced by the decision engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Not enough candles to compute indicators
    #[error("Insufficient market data: need {needed} candles, got {got}")]
    InsufficientData {
        /// Minimum candles required
        needed: usize,
        /// Candles supplied
        got: usize,
    },

    /// Available balance below the configured floor
    #[error("Insufficient balance: {balance} < {minimum}")]
    InsufficientBalance {
        /// Available quote balance
        balance: Decimal,
        /// Configured minimum
        minimum: Decimal,
    },

    /// Order notional below the exchange minimum after lot rounding
    #[error("Notional {notional} below exchange minimum {minimum} after rounding")]
    BelowMinNotional {
        /// Notional after rounding
        notional: Decimal,
        /// Exchange minimum
        minimum: Decimal,
    },

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Domain validation failed
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
