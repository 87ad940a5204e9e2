//! Swing Daemon
//!
//! # Usage
//!
//! ```bash
//! # Paper run against the stub exchange
//! SWING_ENV=test cargo run -p swingd
//!
//! # Live (testnet by default)
//! BINANCE_API_KEY=... BINANCE_API_SECRET=... cargo run -p swingd
//! ```
//!
//! # Environment Variables
//!
//! - `SWING_ENV`: Environment (test, development, production)
//! - `SWING_SYMBOL`: Traded pair (default: BTCUSDT)
//! - `SWING_INTERVAL`: Candle interval (default: 4h)
//! - `SWING_TESTNET`: Use the spot testnet (default: true)
//! - `SWING_MIN_HOLDING_QTY`: Base-asset dust threshold for holdings (default: 0.001)
//! - `SWING_DATA_DIR`: State, recovery log and journal directory (default: data)
//! - `SWING_CHECK_INTERVAL_SECS`: Seconds between cycles (default: 1200)
//! - `SWING_LOG_JSON`: JSON log output (default: false)
//! - `BINANCE_API_KEY` / `BINANCE_API_SECRET`: Required outside the test environment

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use swing_connectors::{BinanceExchange, BinanceRestClient};
use swing_domain::Candle;
use swing_exec::{StubExchange, StubMarketData};
use swing_store::JsonFileStore;
use swingd::{Config, Daemon, DaemonError, Environment};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    // Load configuration
    let config = Config::from_env()?;
    let store = Arc::new(JsonFileStore::new(config.persistence.state_path()));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        symbol = %config.exchange.symbol,
        testnet = config.exchange.testnet,
        state_path = %config.persistence.state_path().display(),
        "Swing Daemon"
    );

    match config.environment {
        Environment::Test => {
            let exchange = Arc::new(StubExchange::new(dec!(50000)));
            exchange.set_balance("USDT", dec!(1000));
            let market = Arc::new(StubMarketData::new());
            let start = Utc::now() - Duration::hours(4 * config.exchange.candle_lookback as i64);
            market.push_series(
                (0..config.exchange.candle_lookback as i64)
                    .map(|i| Candle::flat(dec!(50000), start + Duration::hours(4 * i)))
                    .collect(),
            );

            let daemon = Daemon::new(config, exchange, market, store)?;
            daemon.run_until(wait_for_shutdown()).await?;
        }
        Environment::Development | Environment::Production => {
            let (api_key, api_secret) = match (
                config.exchange.api_key.clone(),
                config.exchange.api_secret.clone(),
            ) {
                (Some(key), Some(secret)) => (key, secret),
                _ => {
                    return Err(DaemonError::Config("Missing Binance credentials".to_string()).into())
                }
            };

            let client = if config.exchange.testnet {
                BinanceRestClient::testnet(api_key, api_secret)
            } else {
                BinanceRestClient::new(api_key, api_secret)
            }
            .with_timeout(config.exchange.request_timeout());

            let exchange = Arc::new(
                BinanceExchange::new(client).with_min_holding_qty(config.exchange.min_holding_qty),
            );
            let daemon = Daemon::new(config, exchange.clone(), exchange, store)?;
            daemon.run_until(wait_for_shutdown()).await?;
        }
    }

    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("swingd=info".parse()?);
    let json = std::env::var("SWING_LOG_JSON")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
            }
            _ => {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C");
        }
    }
}
