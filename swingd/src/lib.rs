//! Swing Daemon Library
//!
//! Runtime orchestrator for the swing trading engine.
//!
//! # Architecture
//!
//! ```text
//! MarketFeed → SignalDetector → PositionManager → OrderExecutor → Exchange
//!                  ↑                  ↓
//!            RiskEvaluator ←── active Position
//!                                     ↓
//!                 Reconciler ↔ StateStore (startup, persistence)
//! ```
//!
//! # Components
//!
//! - **Daemon**: Decision loop and graceful shutdown
//! - **Position Manager**: Sizing, open and close of the single position
//! - **Reconciler**: Startup agreement between persisted state and exchange holdings
//! - **Market Feed**: Candles to `MarketSnapshot`
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use swingd::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let daemon = Daemon::new(config, exchange, market, store)?;
//!     daemon.run_until(shutdown_signal()).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod daemon;
pub mod error;
pub mod market_data;
pub mod position_manager;
pub mod reconciler;

// Re-exports for convenience
pub use config::{
    Config, Environment, ExchangeConfig, PersistenceConfig, PositionConfig, ScheduleConfig,
};
pub use daemon::{CycleReport, Daemon, ShutdownReport};
pub use error::{DaemonError, DaemonResult};
pub use market_data::MarketFeed;
pub use position_manager::PositionManager;
pub use reconciler::{ReconcileOutcome, Reconciled, Reconciler};
