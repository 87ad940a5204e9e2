//! Swing Trading Exchange Connectors
//!
//! Binance spot REST client and the adapter that exposes it through the
//! execution-layer ports. Normalizes exchange-specific types to domain types.

#![warn(clippy::all)]

// Public modules
pub mod adapter;
pub mod binance_rest;

// Re-exports
pub use adapter::BinanceExchange;
pub use binance_rest::{
    BinanceOrderResponse, BinanceRestClient, BinanceRestError, SpotAccount, SpotBalance,
};
