//! Stub implementations for testing.
//!
//! These implementations simulate exchange and market data behavior
//! without making real API calls.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use swing_domain::{
    Candle, ExchangeHoldings, OrderSide, Price, Quantity, Side, Symbol, DEFAULT_MIN_HOLDING_QTY,
};

use crate::error::ExecError;
use crate::ports::{Balances, ExchangePort, MarketDataPort, OrderAck};

// =============================================================================
// Stub Exchange
// =============================================================================

/// Order accepted by the stub, for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedOrder {
    /// Stub order ID
    pub id: String,
    /// Symbol traded
    pub symbol: Symbol,
    /// Direction
    pub side: OrderSide,
    /// Quantity
    pub quantity: Quantity,
    /// Fill price
    pub price: Decimal,
}

/// Stub exchange for testing.
///
/// Simulates immediate fills at a configured price and tracks the resulting
/// net holdings per symbol, so reconciliation sees what was traded.
pub struct StubExchange {
    /// Current prices by symbol
    prices: RwLock<HashMap<String, Decimal>>,
    /// Default price for unknown symbols
    default_price: Decimal,
    /// Free balances by asset
    balances: RwLock<HashMap<String, Decimal>>,
    /// Signed net quantity by symbol (negative = short)
    holdings: RwLock<HashMap<String, Decimal>>,
    /// Order counter for generating IDs
    order_counter: RwLock<u64>,
    /// Orders filled so far
    orders: RwLock<Vec<SubmittedOrder>>,
    /// Whether to simulate failures
    fail_next: RwLock<bool>,
    /// Fail every order until cleared
    reject_orders: RwLock<bool>,
    /// Artificial latency on order submission
    order_delay: RwLock<Option<Duration>>,
}

impl StubExchange {
    /// Create a new stub exchange with default price.
    pub fn new(default_price: Decimal) -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
            default_price,
            balances: RwLock::new(HashMap::new()),
            holdings: RwLock::new(HashMap::new()),
            order_counter: RwLock::new(0),
            orders: RwLock::new(Vec::new()),
            fail_next: RwLock::new(false),
            reject_orders: RwLock::new(false),
            order_delay: RwLock::new(None),
        }
    }

    /// Set price for a specific symbol.
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        let mut prices = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        prices.insert(symbol.to_string(), price);
    }

    /// Get price for a symbol (or default).
    pub fn get_price_decimal(&self, symbol: &str) -> Decimal {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        prices.get(symbol).copied().unwrap_or(self.default_price)
    }

    /// Set the free balance of an asset.
    pub fn set_balance(&self, asset: &str, amount: Decimal) {
        let mut balances = self.balances.write().unwrap_or_else(PoisonError::into_inner);
        balances.insert(asset.to_string(), amount);
    }

    /// Pretend the account holds `quantity` of `symbol` in direction `side`.
    pub fn set_holdings(&self, symbol: &str, side: Side, quantity: Decimal) {
        let signed = match side {
            Side::Long => quantity,
            Side::Short => -quantity,
        };
        let mut holdings = self.holdings.write().unwrap_or_else(PoisonError::into_inner);
        holdings.insert(symbol.to_string(), signed);
    }

    /// Flatten `symbol` (e.g. an external close).
    pub fn clear_holdings(&self, symbol: &str) {
        let mut holdings = self.holdings.write().unwrap_or_else(PoisonError::into_inner);
        holdings.remove(symbol);
    }

    /// Signed net quantity held in `symbol`.
    pub fn net_holdings(&self, symbol: &str) -> Decimal {
        let holdings = self.holdings.read().unwrap_or_else(PoisonError::into_inner);
        holdings.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    /// Configure the next call to fail.
    pub fn set_fail_next(&self, fail: bool) {
        let mut fail_next = self.fail_next.write().unwrap_or_else(PoisonError::into_inner);
        *fail_next = fail;
    }

    /// Reject every order until switched off.
    pub fn set_reject_orders(&self, reject: bool) {
        let mut reject_orders = self.reject_orders.write().unwrap_or_else(PoisonError::into_inner);
        *reject_orders = reject;
    }

    /// Delay order submission (to exercise timeouts).
    pub fn set_order_delay(&self, delay: Option<Duration>) {
        let mut order_delay = self.order_delay.write().unwrap_or_else(PoisonError::into_inner);
        *order_delay = delay;
    }

    /// Orders filled so far.
    pub fn submitted_orders(&self) -> Vec<SubmittedOrder> {
        self.orders.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Generate a unique order ID.
    fn next_order_id(&self) -> String {
        let mut counter = self.order_counter.write().unwrap_or_else(PoisonError::into_inner);
        *counter += 1;
        format!("STUB-{}", *counter)
    }

    /// Check if we should fail the next operation.
    fn should_fail(&self) -> bool {
        let mut fail_next = self.fail_next.write().unwrap_or_else(PoisonError::into_inner);
        let fail = *fail_next;
        *fail_next = false; // Reset after check
        fail
    }

    fn price_of(&self, symbol: &Symbol) -> Result<Price, ExecError> {
        Ok(Price::new(self.get_price_decimal(&symbol.as_pair()))?)
    }
}

#[async_trait]
impl ExchangePort for StubExchange {
    async fn fetch_balance(&self) -> Result<Balances, ExecError> {
        if self.should_fail() {
            return Err(ExecError::Exchange("Simulated balance fetch failure".to_string()));
        }

        let balances = self.balances.read().unwrap_or_else(PoisonError::into_inner);
        Ok(Balances {
            available: balances.clone(),
        })
    }

    async fn fetch_open_holdings(&self, symbol: &Symbol) -> Result<Option<ExchangeHoldings>, ExecError> {
        if self.should_fail() {
            return Err(ExecError::Exchange("Simulated holdings fetch failure".to_string()));
        }

        let net = self.net_holdings(&symbol.as_pair());
        if net.abs() <= DEFAULT_MIN_HOLDING_QTY {
            return Ok(None);
        }

        let side = if net > Decimal::ZERO { Side::Long } else { Side::Short };
        Ok(Some(ExchangeHoldings::new(
            symbol.clone(),
            side,
            Quantity::new(net.abs())?,
            self.price_of(symbol)?,
        )))
    }

    async fn submit_market_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        quantity: Quantity,
    ) -> Result<OrderAck, ExecError> {
        let delay = *self.order_delay.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        // Check if we should simulate a failure
        if self.should_fail() {
            return Err(ExecError::Exchange("Simulated exchange failure".to_string()));
        }
        if *self.reject_orders.read().unwrap_or_else(PoisonError::into_inner) {
            return Err(ExecError::OrderRejected("Simulated rejection".to_string()));
        }

        let price = self.price_of(symbol)?;
        let id = self.next_order_id();

        {
            let mut holdings = self.holdings.write().unwrap_or_else(PoisonError::into_inner);
            let net = holdings.entry(symbol.as_pair()).or_insert(Decimal::ZERO);
            match side {
                OrderSide::Buy => *net += quantity.as_decimal(),
                OrderSide::Sell => *net -= quantity.as_decimal(),
            }
        }

        self.orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SubmittedOrder {
                id: id.clone(),
                symbol: symbol.clone(),
                side,
                quantity,
                price: price.as_decimal(),
            });

        Ok(OrderAck {
            id,
            filled_quantity: quantity.as_decimal(),
            status: "FILLED".to_string(),
            average_price: Some(price),
        })
    }

    async fn fetch_last_price(&self, symbol: &Symbol) -> Result<Price, ExecError> {
        if self.should_fail() {
            return Err(ExecError::Exchange("Simulated price fetch failure".to_string()));
        }
        self.price_of(symbol)
    }

    async fn health_check(&self) -> Result<(), ExecError> {
        if self.should_fail() {
            return Err(ExecError::Exchange("Simulated health check failure".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Stub Market Data
// =============================================================================

/// Stub market data provider for testing.
///
/// Serves queued candle series one per fetch, then keeps repeating the last.
pub struct StubMarketData {
    /// Series not yet served
    queue: RwLock<VecDeque<Vec<Candle>>>,
    /// Last series served
    last: RwLock<Vec<Candle>>,
    /// Whether to simulate failures
    fail_next: RwLock<bool>,
}

impl StubMarketData {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self {
            queue: RwLock::new(VecDeque::new()),
            last: RwLock::new(Vec::new()),
            fail_next: RwLock::new(false),
        }
    }

    /// Queue a series to be returned by a later fetch.
    pub fn push_series(&self, candles: Vec<Candle>) {
        self.queue
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(candles);
    }

    /// Configure the next fetch to fail.
    pub fn set_fail_next(&self, fail: bool) {
        *self.fail_next.write().unwrap_or_else(PoisonError::into_inner) = fail;
    }
}

impl Default for StubMarketData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataPort for StubMarketData {
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        _interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ExecError> {
        {
            let mut fail_next = self.fail_next.write().unwrap_or_else(PoisonError::into_inner);
            if *fail_next {
                *fail_next = false;
                return Err(ExecError::MarketData("Simulated candle fetch failure".to_string()));
            }
        }

        let next = self
            .queue
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let mut last = self.last.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(series) = next {
            *last = series;
        }

        if last.is_empty() {
            return Err(ExecError::MarketData(format!("No candles for {}", symbol)));
        }

        let skip = last.len().saturating_sub(limit);
        Ok(last[skip..].to_vec())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn btc() -> Symbol {
        Symbol::from_pair("BTCUSDT").unwrap()
    }

    #[tokio::test]
    async fn test_stub_exchange_fill_updates_holdings() {
        let exchange = StubExchange::new(dec!(95000));

        let ack = exchange
            .submit_market_order(&btc(), OrderSide::Buy, Quantity::new(dec!(0.1)).unwrap())
            .await
            .unwrap();

        assert_eq!(ack.id, "STUB-1");
        assert_eq!(ack.average_price.unwrap().as_decimal(), dec!(95000));

        let held = exchange.fetch_open_holdings(&btc()).await.unwrap().unwrap();
        assert_eq!(held.side, Side::Long);
        assert_eq!(held.quantity.as_decimal(), dec!(0.1));

        exchange
            .submit_market_order(&btc(), OrderSide::Sell, Quantity::new(dec!(0.1)).unwrap())
            .await
            .unwrap();
        assert!(exchange.fetch_open_holdings(&btc()).await.unwrap().is_none());
        assert_eq!(exchange.submitted_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_stub_exchange_custom_price() {
        let exchange = StubExchange::new(dec!(95000));
        exchange.set_price("ETHUSDT", dec!(3000));

        let eth = Symbol::from_pair("ETHUSDT").unwrap();
        assert_eq!(exchange.fetch_last_price(&eth).await.unwrap().as_decimal(), dec!(3000));
        assert_eq!(exchange.fetch_last_price(&btc()).await.unwrap().as_decimal(), dec!(95000));
    }

    #[tokio::test]
    async fn test_stub_exchange_simulated_failure() {
        let exchange = StubExchange::new(dec!(95000));

        // Configure failure
        exchange.set_fail_next(true);

        let result = exchange
            .submit_market_order(&btc(), OrderSide::Buy, Quantity::new(dec!(0.1)).unwrap())
            .await;
        assert!(result.is_err());

        // Next call should succeed
        let result = exchange
            .submit_market_order(&btc(), OrderSide::Buy, Quantity::new(dec!(0.1)).unwrap())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_stub_exchange_short_holdings_and_dust() {
        let exchange = StubExchange::new(dec!(95000));
        exchange.set_holdings("BTCUSDT", Side::Short, dec!(0.5));
        let held = exchange.fetch_open_holdings(&btc()).await.unwrap().unwrap();
        assert_eq!(held.side, Side::Short);

        exchange.set_holdings("BTCUSDT", Side::Long, dec!(0.0005));
        assert!(exchange.fetch_open_holdings(&btc()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stub_market_data_serves_queue_then_repeats() {
        let market_data = StubMarketData::new();
        let now = Utc::now();
        market_data.push_series(vec![Candle::flat(dec!(1), now), Candle::flat(dec!(2), now)]);
        market_data.push_series(vec![Candle::flat(dec!(3), now)]);

        let first = market_data.fetch_candles(&btc(), "4h", 1).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].close, dec!(2));

        let second = market_data.fetch_candles(&btc(), "4h", 10).await.unwrap();
        assert_eq!(second[0].close, dec!(3));

        let repeat = market_data.fetch_candles(&btc(), "4h", 10).await.unwrap();
        assert_eq!(repeat, second);
    }

    #[tokio::test]
    async fn test_stub_market_data_empty_fails() {
        let market_data = StubMarketData::new();
        assert!(market_data.fetch_candles(&btc(), "4h", 10).await.is_err());
    }
}
