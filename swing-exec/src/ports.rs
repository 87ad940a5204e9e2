//! Execution layer port definitions.
//!
//! Ports define the interfaces for external services (exchange, market data).
//! Adapters implement these ports for specific services (Binance, stub, etc.).

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use swing_domain::{Candle, ExchangeHoldings, OrderSide, Price, Quantity, Symbol};

use crate::error::ExecError;

// =============================================================================
// Exchange Port
// =============================================================================

/// Port for account and order operations.
///
/// Implementations:
/// - `StubExchange` - For testing (immediate fills at configured price)
/// - `BinanceExchange` - Binance spot REST
#[async_trait]
pub trait ExchangePort: Send + Sync {
    /// Available (free) balance per asset.
    async fn fetch_balance(&self) -> Result<Balances, ExecError>;

    /// Current exposure in `symbol`, or `None` when flat.
    async fn fetch_open_holdings(&self, symbol: &Symbol) -> Result<Option<ExchangeHoldings>, ExecError>;

    /// Submit a market order.
    ///
    /// May fail with a transport error or an exchange rejection.
    async fn submit_market_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        quantity: Quantity,
    ) -> Result<OrderAck, ExecError>;

    /// Last traded price.
    async fn fetch_last_price(&self, symbol: &Symbol) -> Result<Price, ExecError>;

    /// Check if exchange is reachable.
    async fn health_check(&self) -> Result<(), ExecError>;
}

/// Free balances keyed by asset (e.g. "USDT", "BTC").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    /// Asset → free amount
    pub available: HashMap<String, Decimal>,
}

impl Balances {
    /// Free amount of `asset`, zero when absent.
    pub fn available(&self, asset: &str) -> Decimal {
        self.available.get(asset).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Exchange acknowledgement of a market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Exchange-assigned order ID
    pub id: String,
    /// Quantity actually filled
    pub filled_quantity: Decimal,
    /// Exchange status string (e.g. "FILLED")
    pub status: String,
    /// Average fill price when the exchange reports one
    pub average_price: Option<Price>,
}

// =============================================================================
// Order Result
// =============================================================================

/// Outcome of an order as seen by the position manager.
///
/// A simulated fill stands in for an order the exchange did not accept, so
/// bookkeeping can continue. Callers must handle it explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderResult {
    /// Real fill reported by the exchange
    Filled {
        /// Exchange order ID
        order_id: String,
        /// Filled quantity
        quantity: Quantity,
        /// Fill price
        price: Price,
        /// Exchange status string
        status: String,
    },
    /// Locally synthesized fill after a submission failure
    SimulatedFilled {
        /// `simulated-<uuid>`
        order_id: String,
        /// Requested quantity
        quantity: Quantity,
        /// Reference price at submission
        price: Price,
        /// Why the real order failed
        reason: String,
    },
}

impl OrderResult {
    /// Order identifier (exchange or simulated).
    pub fn order_id(&self) -> &str {
        match self {
            OrderResult::Filled { order_id, .. } | OrderResult::SimulatedFilled { order_id, .. } => {
                order_id
            }
        }
    }

    /// Fill price.
    pub fn price(&self) -> Price {
        match self {
            OrderResult::Filled { price, .. } | OrderResult::SimulatedFilled { price, .. } => *price,
        }
    }

    /// Filled quantity.
    pub fn quantity(&self) -> Quantity {
        match self {
            OrderResult::Filled { quantity, .. } | OrderResult::SimulatedFilled { quantity, .. } => {
                *quantity
            }
        }
    }

    /// True for the simulated fallback.
    pub fn is_simulated(&self) -> bool {
        matches!(self, OrderResult::SimulatedFilled { .. })
    }
}

// =============================================================================
// Market Data Port
// =============================================================================

/// Port for candle history.
///
/// Implementations:
/// - `StubMarketData` - For testing (scripted candle series)
/// - `BinanceExchange` - Binance spot klines
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Most recent `limit` candles for `symbol` at `interval` (e.g. "4h"), oldest first.
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ExecError>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_result_accessors() {
        let filled = OrderResult::Filled {
            order_id: "12345".to_string(),
            quantity: Quantity::new(dec!(0.1)).unwrap(),
            price: Price::new(dec!(95000)).unwrap(),
            status: "FILLED".to_string(),
        };
        assert_eq!(filled.order_id(), "12345");
        assert!(!filled.is_simulated());

        let simulated = OrderResult::SimulatedFilled {
            order_id: "simulated-1".to_string(),
            quantity: Quantity::new(dec!(0.1)).unwrap(),
            price: Price::new(dec!(95000)).unwrap(),
            reason: "timeout".to_string(),
        };
        assert!(simulated.is_simulated());
        assert_eq!(simulated.price().as_decimal(), dec!(95000));
    }

    #[test]
    fn test_simulated_fill_is_tagged_in_json() {
        let simulated = OrderResult::SimulatedFilled {
            order_id: "simulated-1".to_string(),
            quantity: Quantity::new(dec!(1)).unwrap(),
            price: Price::new(dec!(10)).unwrap(),
            reason: "rejected".to_string(),
        };

        let json = serde_json::to_string(&simulated).unwrap();
        assert!(json.contains("SimulatedFilled"));
        let parsed: OrderResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, simulated);
    }

    #[test]
    fn test_missing_balance_is_zero() {
        let mut balances = Balances::default();
        balances.available.insert("USDT".to_string(), dec!(250));
        assert_eq!(balances.available("USDT"), dec!(250));
        assert_eq!(balances.available("BTC"), Decimal::ZERO);
    }
}
