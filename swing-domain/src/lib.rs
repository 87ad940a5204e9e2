//! Swing Trading Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains entities, value objects, and domain rules shared by the engine,
//! the executor, the state store and the daemon.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod holdings;
pub mod market_data;
pub mod metrics;
pub mod trailing;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{ExitReason, Position, PositionId, Signal, TradeRecord};
pub use holdings::{ExchangeHoldings, DEFAULT_MIN_HOLDING_QTY};
pub use market_data::{Candle, MarketSnapshot, TrendDirection};
pub use metrics::PerformanceMetrics;
pub use trailing::{
    is_trailing_stop_hit, update_trailing_stop, TrailingParams, TrailingStopChange,
    TrailingStopUpdate,
};
pub use value_objects::{DomainError, OrderSide, Price, Quantity, Side, Symbol};
