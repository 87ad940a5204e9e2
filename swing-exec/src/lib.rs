//! Swing Trading Execution Layer
//!
//! Exchange access behind ports, with bounded calls and a simulated-fill
//! fallback for order submission.
//!
//! # Architecture
//!
//! ```text
//! PositionManager → OrderExecutor → ExchangePort → OrderResult
//! MarketFeed      → MarketDataPort → Vec<Candle>
//! ```
//!
//! # Components
//!
//! - **Ports**: Traits defining interfaces for exchange and market data
//! - **Executor**: Timeouts and `Filled | SimulatedFilled` results
//! - **Stub**: Test implementations for development
//!
//! # Example
//!
//! ```rust,ignore
//! use swing_exec::{OrderExecutor, StubExchange, DEFAULT_REQUEST_TIMEOUT};
//! use std::sync::Arc;
//!
//! let exchange = Arc::new(StubExchange::new(dec!(95000)));
//! let executor = OrderExecutor::new(exchange, DEFAULT_REQUEST_TIMEOUT);
//!
//! let result = executor.submit_market_order(&symbol, OrderSide::Buy, qty, price).await;
//! if result.is_simulated() { /* paper fill */ }
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod executor;
pub mod ports;
pub mod stub;

// Re-exports for convenience
pub use error::{ExecError, ExecResult};
pub use executor::{OrderExecutor, DEFAULT_REQUEST_TIMEOUT};
pub use ports::{Balances, ExchangePort, MarketDataPort, OrderAck, OrderResult};
pub use stub::{StubExchange, StubMarketData, SubmittedOrder};
