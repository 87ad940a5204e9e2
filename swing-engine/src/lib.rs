//! Swing Trading Engine Layer
//!
//! Pure decision logic, deterministic, no I/O.
//! Takes market snapshots and state → returns decisions for the daemon to execute.
//!
//! - [`analyzer`]: candles → `MarketSnapshot`
//! - [`detector`]: pending-signal state machine
//! - [`risk`]: trailing stop maintenance and exit evaluation
//! - [`sizing`]: balance-based position sizing

#![warn(clippy::all)]

pub mod analyzer;
pub mod detector;
pub mod error;
pub mod indicators;
pub mod risk;
pub mod sizing;

pub use analyzer::{classify_trend, is_pullback_to_ema, AnalyzerConfig, MarketAnalyzer};
pub use detector::{DetectorConfig, SignalDetector, SignalOutcome};
pub use error::{EngineError, EngineResult};
pub use risk::{RiskConfig, RiskEvaluator};
pub use sizing::{size_position, PositionSize, SizingParams};
